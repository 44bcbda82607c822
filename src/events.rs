use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};

/// A patient entry as the queue server serializes it.
///
/// `id` is absent/null for placeholder payloads the server sends when a
/// counter has no patient bound; `counter_id` is only present on payloads
/// that are addressed to a specific counter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub counter_id: Option<i64>,
    #[serde(default)]
    pub call_number: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub status: PatientStatus,
    #[serde(default = "default_language")]
    pub language_code: String,
    /// Staff id this patient is earmarked for, if the activity is a
    /// staff-specific one. The server sends `false` when it is not.
    #[serde(default, deserialize_with = "de_staff_ref")]
    pub activity_is_staff: Option<i64>,
}

fn default_language() -> String {
    "fr".to_string()
}

/// Accepts `false`, `null` or an integer staff id.
fn de_staff_ref<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    })
}

/// Lifecycle status of a called patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    /// Called, on their way to the counter.
    Calling,
    /// At the counter, being served.
    Ongoing,
    #[serde(other)]
    #[default]
    Unknown,
}

impl PatientStatus {
    pub fn label(self) -> &'static str {
        match self {
            PatientStatus::Calling => "En appel",
            PatientStatus::Ongoing => "Au comptoir",
            PatientStatus::Unknown => "????",
        }
    }
}

/// Which counters a server-pushed notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationScope {
    /// Every counter.
    Broadcast,
    /// A single counter.
    ForCounter(i64),
    /// An explicit set of counters.
    ForCounters(BTreeSet<i64>),
}

impl NotificationScope {
    /// Whether a client bound to `counter_id` should react to this
    /// notification.
    pub fn accepts(&self, counter_id: i64) -> bool {
        match self {
            NotificationScope::Broadcast => true,
            NotificationScope::ForCounter(id) => *id == counter_id,
            NotificationScope::ForCounters(ids) => ids.contains(&counter_id),
        }
    }
}

/// Body of a server-pushed notification.
///
/// `origin` selects title, background color and sound via the presentation
/// lookup table in `notify`; unrecognized origins fall back to the raw
/// origin string as the title.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationPayload {
    pub origin: String,
    pub message: String,
}

/// Typed events decoded from the realtime channel, consumed by the UI
/// state machine. Events are transient: applied once, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Full replacement of the waiting-patient list.
    PatientListUpdated { patients: Vec<Patient> },
    /// The patient currently bound to this counter changed (or was cleared).
    CurrentPatientChanged { patient: Option<Patient> },
    /// A server-pushed toast, possibly scoped to specific counters.
    Notification {
        scope: NotificationScope,
        payload: NotificationPayload,
    },
    /// Printer paper state flipped (needs changing / was changed).
    PaperStatusChanged { active: bool },
    /// Auto-calling was toggled for a counter.
    AutoCallingChanged { counter_id: Option<i64>, active: bool },
    /// Auto-calling pulled a new patient to a counter.
    AutoCallingPatientArrived {
        counter_id: Option<i64>,
        patient: Patient,
    },
    /// Another workstation logged this counter's staff out.
    StaffDisconnectedByOther {
        counter_id: Option<i64>,
        staff_name: String,
    },
    /// The server cleared the whole patient list (daily reset).
    PatientListCleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_deserializes_full_payload() {
        let p: Patient = serde_json::from_str(
            r#"{"id": 12, "counter_id": 3, "call_number": "A-7", "activity": "Vaccin",
                "status": "calling", "language_code": "en", "activity_is_staff": 4}"#,
        )
        .unwrap();
        assert_eq!(p.id, Some(12));
        assert_eq!(p.counter_id, Some(3));
        assert_eq!(p.status, PatientStatus::Calling);
        assert_eq!(p.language_code, "en");
        assert_eq!(p.activity_is_staff, Some(4));
    }

    #[test]
    fn patient_accepts_false_staff_ref() {
        let p: Patient = serde_json::from_str(
            r#"{"id": 1, "call_number": "B-2", "activity": "Retrait", "activity_is_staff": false}"#,
        )
        .unwrap();
        assert_eq!(p.activity_is_staff, None);
        assert_eq!(p.language_code, "fr");
    }

    #[test]
    fn unknown_status_maps_to_unknown() {
        let p: Patient =
            serde_json::from_str(r#"{"id": 1, "call_number": "C-1", "status": "levitating"}"#)
                .unwrap();
        assert_eq!(p.status, PatientStatus::Unknown);
        assert_eq!(p.status.label(), "????");
    }

    #[test]
    fn broadcast_scope_accepts_any_counter() {
        assert!(NotificationScope::Broadcast.accepts(1));
        assert!(NotificationScope::Broadcast.accepts(999));
    }

    #[test]
    fn counter_set_scope_filters() {
        let scope = NotificationScope::ForCounters(BTreeSet::from([3, 5]));
        assert!(scope.accepts(5));
        assert!(!scope.accepts(7));
    }

    #[test]
    fn single_counter_scope_filters() {
        let scope = NotificationScope::ForCounter(2);
        assert!(scope.accepts(2));
        assert!(!scope.accepts(3));
    }
}
