use std::time::{Duration, Instant};

/// Inset from the screen's bottom-left corner, in logical pixels.
pub const EDGE_INSET: f32 = 20.0;
/// Vertical gap between stacked toasts.
pub const TOAST_SPACING: f32 = 10.0;
/// Auto-dismiss delay when the user never clicks a toast away.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);

/// Background tint of a toast. Plain announcements stay on the default
/// surface color; orange warns, red alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastColor {
    Default,
    Orange,
    Red,
}

/// Which sample accompanies a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastSound {
    Ding,
    PleaseValidate,
}

/// Title, tint and sound derived from a notification's origin tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ToastStyle {
    pub title: String,
    pub color: ToastColor,
    pub sound: ToastSound,
}

impl ToastStyle {
    fn plain(title: &str) -> Self {
        ToastStyle {
            title: title.to_string(),
            color: ToastColor::Default,
            sound: ToastSound::Ding,
        }
    }

    fn tinted(title: &str, color: ToastColor) -> Self {
        ToastStyle {
            title: title.to_string(),
            color,
            sound: ToastSound::Ding,
        }
    }
}

/// Origin tag to presentation lookup. Unrecognized origins show the raw tag
/// as the title so server-side additions degrade gracefully.
pub fn presentation(origin: &str) -> ToastStyle {
    match origin {
        "new_patient" => ToastStyle::plain("Nouveau patient !"),
        "autocalling" => ToastStyle::plain("Ils arrivent !"),
        "activity" => ToastStyle::plain("Une nouvelle mission arrive !"),
        "patient_taken" => ToastStyle::plain("A une seconde près !"),
        "disconnect_by_user" => ToastStyle::plain("Pousse toi de là !"),
        "connection" => ToastStyle::plain("Problème de connexion"),
        "printer_error" => ToastStyle::plain("Je crois qu'on a un problème..."),
        "low_paper" => ToastStyle::tinted("Fin du rouleau !", ToastColor::Orange),
        "no_paper" => ToastStyle::tinted("Il n'y a plus de papier !", ToastColor::Red),
        "please_validate" => ToastStyle {
            title: "Sauvez un bébé phoque : validez votre patient !".to_string(),
            color: ToastColor::Red,
            sound: ToastSound::PleaseValidate,
        },
        "socket_connection_false" => ToastStyle::tinted("Connexion perdue !", ToastColor::Red),
        "socket_connection_true" => ToastStyle::plain("Connexion rétablie !"),
        "test_notification" => ToastStyle::plain("Test micro, 1, 2, 3, Test..."),
        other => ToastStyle::plain(other),
    }
}

/// One live toast. Height is measured by the view layer when the surface is
/// created, since it depends on how much the message wraps.
#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub style: ToastStyle,
    pub message: String,
    pub height: f32,
    pub deadline: Instant,
}

/// Where a toast sits, anchored to the screen's bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToastPlacement {
    pub id: u64,
    pub inset_left: f32,
    /// Distance from the screen bottom to the toast's bottom edge.
    pub inset_bottom: f32,
    pub height: f32,
}

impl ToastPlacement {
    /// Distance from the screen bottom to the toast's top edge.
    pub fn top_offset(&self) -> f32 {
        self.inset_bottom + self.height
    }
}

/// Active toast list. Mutated only on the UI thread; background workers
/// reach it exclusively through posted messages.
#[derive(Debug)]
pub struct ToastStack {
    toasts: Vec<Toast>,
    next_id: u64,
    ttl: Duration,
}

impl ToastStack {
    pub fn new(ttl: Duration) -> Self {
        ToastStack {
            toasts: Vec::new(),
            next_id: 0,
            ttl,
        }
    }

    /// Append a toast and return its id. Positions of every active toast are
    /// recomputed on the next `placements()` call, so no explicit relayout
    /// step exists.
    pub fn add(&mut self, style: ToastStyle, message: String, height: f32, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            style,
            message,
            height,
            deadline: now + self.ttl,
        });
        id
    }

    /// Drop a toast (clicked away, escape, or its surface closed). No-op if
    /// the id is already gone, so a click racing the auto-dismiss is safe.
    pub fn remove(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Collect the ids whose auto-dismiss deadline has passed and drop them.
    pub fn expire(&mut self, now: Instant) -> Vec<u64> {
        let expired: Vec<u64> = self
            .toasts
            .iter()
            .filter(|t| now >= t.deadline)
            .map(|t| t.id)
            .collect();
        self.toasts.retain(|t| now < t.deadline);
        expired
    }

    pub fn get(&self, id: u64) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// Current geometry of the stack: the oldest toast hugs the bottom-left
    /// inset, each following one sits a gap above the previous.
    pub fn placements(&self) -> Vec<ToastPlacement> {
        let mut bottom = EDGE_INSET;
        self.toasts
            .iter()
            .map(|t| {
                let placement = ToastPlacement {
                    id: t.id,
                    inset_left: EDGE_INSET,
                    inset_bottom: bottom,
                    height: t.height,
                };
                bottom += t.height + TOAST_SPACING;
                placement
            })
            .collect()
    }
}

impl Default for ToastStack {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with(heights: &[f32]) -> ToastStack {
        let mut stack = ToastStack::default();
        let now = Instant::now();
        for h in heights {
            stack.add(presentation("new_patient"), "msg".into(), *h, now);
        }
        stack
    }

    #[test]
    fn three_toasts_stack_without_overlap() {
        let stack = stack_with(&[120.0, 80.0, 100.0]);
        let offsets: Vec<f32> = stack.placements().iter().map(|p| p.top_offset()).collect();
        assert_eq!(offsets, vec![140.0, 230.0, 340.0]);
    }

    #[test]
    fn removal_recomputes_positions() {
        let mut stack = stack_with(&[120.0, 80.0, 100.0]);
        let middle = stack.placements()[1].id;
        stack.remove(middle);
        let offsets: Vec<f32> = stack.placements().iter().map(|p| p.top_offset()).collect();
        assert_eq!(offsets, vec![140.0, 250.0]);
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut stack = stack_with(&[120.0]);
        stack.remove(999);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn expiry_drops_only_overdue_toasts() {
        let mut stack = ToastStack::new(Duration::from_secs(5));
        let t0 = Instant::now();
        let first = stack.add(presentation("autocalling"), "a".into(), 100.0, t0);
        let second = stack.add(
            presentation("autocalling"),
            "b".into(),
            100.0,
            t0 + Duration::from_secs(3),
        );
        let expired = stack.expire(t0 + Duration::from_secs(6));
        assert_eq!(expired, vec![first]);
        assert!(stack.get(second).is_some());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn presentation_table_covers_alerts() {
        assert_eq!(presentation("low_paper").color, ToastColor::Orange);
        assert_eq!(presentation("no_paper").color, ToastColor::Red);
        let validate = presentation("please_validate");
        assert_eq!(validate.color, ToastColor::Red);
        assert_eq!(validate.sound, ToastSound::PleaseValidate);
        assert_eq!(presentation("socket_connection_false").color, ToastColor::Red);
        assert_eq!(presentation("socket_connection_true").color, ToastColor::Default);
    }

    #[test]
    fn unknown_origin_falls_back_to_raw_tag() {
        let style = presentation("brand_new_server_feature");
        assert_eq!(style.title, "brand_new_server_feature");
        assert_eq!(style.color, ToastColor::Default);
        assert_eq!(style.sound, ToastSound::Ding);
    }
}
