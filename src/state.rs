use std::time::{Duration, Instant};

use crate::config::NotifyPrefs;
use crate::events::{InboundEvent, Patient, PatientStatus};
use crate::util::language_tag;

/// What the current-patient slot shows. The distinctions matter to the
/// label text: a cleared list, an explicit release and an empty slot all
/// read differently at the counter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CurrentPatient {
    /// Nothing bound (list cleared or server said null).
    #[default]
    NoPatient,
    /// Just released back to the waiting pool.
    Released,
    /// A payload addressed to this counter carried a null patient id.
    EmptySlot,
    /// Someone else claimed the patient first.
    Taken,
    Assigned(Patient),
}

/// Side effects the event application produces. The UI layer turns these
/// into toasts, sounds and session changes; nothing here touches widgets.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Toast { origin: String, message: String },
    /// Another workstation released this counter's staff binding.
    LoggedOut,
    /// Validate-or-call raced another counter; announce with sound only.
    PatientAlreadyTaken,
}

fn toast(origin: &str, message: String) -> Reaction {
    Reaction::Toast {
        origin: origin.to_string(),
        message,
    }
}

/// Logged-in staff, as the server reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Staff {
    pub id: i64,
    pub name: String,
}

/// Everything the counter knows, mutated only on the UI thread.
/// Realtime events and HTTP responses are both folded in here.
#[derive(Debug)]
pub struct CounterState {
    pub counter_id: i64,
    pub waiting: Vec<Patient>,
    pub current: CurrentPatient,
    pub staff: Option<Staff>,
    pub paper_low: bool,
    pub auto_calling: bool,
    validate_reminder: Duration,
    validate_deadline: Option<Instant>,
}

impl CounterState {
    pub fn new(counter_id: i64, validate_reminder: Duration) -> Self {
        CounterState {
            counter_id,
            waiting: Vec::new(),
            current: CurrentPatient::NoPatient,
            staff: None,
            paper_low: false,
            auto_calling: false,
            validate_reminder,
            validate_deadline: None,
        }
    }

    /// Fold one realtime event in. Returns the side effects, already gated
    /// by the notification preferences.
    pub fn apply_event(
        &mut self,
        event: InboundEvent,
        prefs: &NotifyPrefs,
        now: Instant,
    ) -> Vec<Reaction> {
        match event {
            InboundEvent::PatientListUpdated { patients } => {
                self.waiting = patients;
                Vec::new()
            }
            InboundEvent::CurrentPatientChanged { patient } => {
                self.set_current(patient, now);
                Vec::new()
            }
            InboundEvent::Notification { scope, payload } => {
                if !scope.accepts(self.counter_id) {
                    return Vec::new();
                }
                // Printer-origin notifications double as paper state so the
                // paper button tracks without a second toast.
                match payload.origin.as_str() {
                    "low_paper" | "no_paper" => self.paper_low = true,
                    _ => {}
                }
                if prefs.specific_acts {
                    vec![toast(&payload.origin, payload.message)]
                } else {
                    Vec::new()
                }
            }
            InboundEvent::PaperStatusChanged { active } => {
                self.paper_low = active;
                if prefs.add_paper {
                    let message = if active {
                        "On est quasiment au bout du rouleau"
                    } else {
                        "Une gentille personne a remis du papier"
                    };
                    vec![toast("low_paper", message.to_string())]
                } else {
                    Vec::new()
                }
            }
            InboundEvent::AutoCallingChanged { active, .. } => {
                self.auto_calling = active;
                Vec::new()
            }
            InboundEvent::AutoCallingPatientArrived { patient, .. } => {
                let message = format!(
                    "Appel automatique du patient {} pour '{}'",
                    patient.call_number, patient.activity
                );
                self.set_current(Some(patient), now);
                if prefs.autocalling {
                    vec![toast("autocalling", message)]
                } else {
                    Vec::new()
                }
            }
            InboundEvent::StaffDisconnectedByOther { staff_name, .. } => {
                self.staff = None;
                vec![
                    toast(
                        "disconnect_by_user",
                        format!("Vous avez été déconnecté par {staff_name}"),
                    ),
                    Reaction::LoggedOut,
                ]
            }
            InboundEvent::PatientListCleared => {
                self.waiting.clear();
                self.set_current(None, now);
                Vec::new()
            }
        }
    }

    /// Fold in the response of a patient-action call (call next, validate,
    /// pause, call specific). The status code carries the semantics.
    pub fn apply_patient_response(
        &mut self,
        status: u16,
        body: &str,
        prefs: &NotifyPrefs,
        now: Instant,
    ) -> Vec<Reaction> {
        match status {
            200 => match serde_json::from_str::<Patient>(body) {
                Ok(patient) => {
                    let message = format!(
                        "Nouveau patient : {} pour '{}'",
                        patient.call_number, patient.activity
                    );
                    self.set_current(Some(patient), now);
                    if prefs.current_patient {
                        vec![toast("new_patient", message)]
                    } else {
                        Vec::new()
                    }
                }
                Err(e) => {
                    tracing::warn!("undecodable patient payload: {e}");
                    Vec::new()
                }
            },
            // 204 carries no body: nothing left to act on.
            204 => {
                self.set_current(None, now);
                Vec::new()
            }
            // 201: the patient went back to the waiting pool.
            201 => {
                self.current = CurrentPatient::Released;
                self.validate_deadline = None;
                Vec::new()
            }
            // 423: another counter claimed them first.
            423 => {
                self.current = CurrentPatient::Taken;
                self.validate_deadline = None;
                vec![Reaction::PatientAlreadyTaken]
            }
            other => {
                tracing::warn!("patient action failed with status {other}");
                Vec::new()
            }
        }
    }

    /// Fold in the staff-on-counter bootstrap response. 204 means nobody is
    /// logged in here and the login screen should come up.
    pub fn apply_staff_response(&mut self, status: u16, body: &str) -> Vec<Reaction> {
        match status {
            200 => {
                #[derive(serde::Deserialize)]
                struct Wrapper {
                    staff: Staff2,
                }
                #[derive(serde::Deserialize)]
                struct Staff2 {
                    id: i64,
                    name: String,
                }
                match serde_json::from_str::<Wrapper>(body) {
                    Ok(w) => {
                        self.staff = Some(Staff {
                            id: w.staff.id,
                            name: w.staff.name,
                        });
                        Vec::new()
                    }
                    Err(e) => {
                        tracing::warn!("undecodable staff payload: {e}");
                        Vec::new()
                    }
                }
            }
            204 => {
                self.staff = None;
                vec![Reaction::LoggedOut]
            }
            other => {
                tracing::warn!("staff lookup failed with status {other}");
                Vec::new()
            }
        }
    }

    fn set_current(&mut self, patient: Option<Patient>, now: Instant) {
        match patient {
            None => {
                self.current = CurrentPatient::NoPatient;
                self.validate_deadline = None;
            }
            Some(p) => {
                // Payloads addressed to another counter are not ours to show.
                if p.counter_id.is_some() && p.counter_id != Some(self.counter_id) {
                    return;
                }
                if p.id.is_none() {
                    self.current = CurrentPatient::EmptySlot;
                    self.validate_deadline = None;
                } else {
                    // A freshly called patient starts the validation
                    // reminder clock; one at the counter stops it.
                    self.validate_deadline = match p.status {
                        PatientStatus::Calling => Some(now + self.validate_reminder),
                        _ => None,
                    };
                    self.current = CurrentPatient::Assigned(p);
                }
            }
        }
    }

    /// Check the validation reminder. Fires at most once per called
    /// patient.
    pub fn poll_validate_reminder(&mut self, now: Instant) -> Option<Reaction> {
        match self.validate_deadline {
            Some(deadline) if now >= deadline => {
                self.validate_deadline = None;
                Some(toast(
                    "please_validate",
                    "Pensez à valider votre patient afin de vider l'écran d'affichage.".to_string(),
                ))
            }
            _ => None,
        }
    }

    pub fn current_label(&self) -> String {
        match &self.current {
            CurrentPatient::NoPatient => "Plus de patient".to_string(),
            CurrentPatient::Released => "Pas de patient".to_string(),
            CurrentPatient::EmptySlot => "Pas de patient en cours".to_string(),
            CurrentPatient::Taken => "Patient déjà attribué".to_string(),
            CurrentPatient::Assigned(p) => format!(
                "{}{} {} ({})",
                p.call_number,
                language_tag(&p.language_code),
                p.status.label(),
                p.activity
            ),
        }
    }

    pub fn current_patient_id(&self) -> Option<i64> {
        match &self.current {
            CurrentPatient::Assigned(p) => p.id,
            _ => None,
        }
    }

    /// Validation only makes sense while the patient is being called.
    pub fn can_validate(&self) -> bool {
        matches!(&self.current, CurrentPatient::Assigned(p) if p.status == PatientStatus::Calling)
    }

    /// Pausing only makes sense once the patient is at the counter.
    pub fn can_pause(&self) -> bool {
        matches!(&self.current, CurrentPatient::Assigned(p) if p.status == PatientStatus::Ongoing)
    }

    pub fn is_logged_in(&self) -> bool {
        self.staff.is_some()
    }
}
