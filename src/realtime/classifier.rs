use std::collections::BTreeSet;

use serde_json::Value;

use crate::events::{InboundEvent, NotificationPayload, NotificationScope, Patient};

/// Why an inbound message was dropped.
///
/// Only decode failures are reported; unrecognized discriminators are not an
/// error (the server grows new event kinds faster than clients update) and
/// classify to `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("message is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
    #[error("message has no `flag`/`type` discriminator")]
    MissingDiscriminator,
    #[error("`{kind}` payload malformed: {detail}")]
    BadPayload { kind: &'static str, detail: String },
}

/// Classify one raw realtime message into a typed event.
///
/// The envelope is `{"flag"|"type": string, "data": any}` where `data` may
/// itself be a JSON-encoded string needing a second decode pass (the server
/// double-encodes some payloads). Pure: no side effects beyond the returned
/// value.
pub fn classify(raw: &str) -> Result<Option<InboundEvent>, ClassifyError> {
    let envelope: Value = serde_json::from_str(raw)?;
    classify_value(&envelope)
}

/// Classify an already-deserialized envelope.
pub fn classify_value(envelope: &Value) -> Result<Option<InboundEvent>, ClassifyError> {
    let kind = envelope
        .get("flag")
        .or_else(|| envelope.get("type"))
        .and_then(Value::as_str)
        .ok_or(ClassifyError::MissingDiscriminator)?;

    let data = decode_twice(envelope.get("data").cloned().unwrap_or(Value::Null))?;

    let event = match kind {
        "update_patient_list" => {
            let patients: Vec<Patient> = from_value("update_patient_list", data)?;
            InboundEvent::PatientListUpdated { patients }
        }
        "my_patient" => {
            // `null` and `false` both mean "no patient on this counter".
            let patient = match data {
                Value::Null | Value::Bool(false) => None,
                other => Some(from_value("my_patient", other)?),
            };
            InboundEvent::CurrentPatientChanged { patient }
        }
        "notification" => classify_notification(data)?,
        "paper" => {
            let active = data
                .get("add_paper")
                .and_then(Value::as_bool)
                .ok_or_else(|| bad("paper", "missing `add_paper` bool"))?;
            InboundEvent::PaperStatusChanged { active }
        }
        "change_auto_calling" => {
            let active = data
                .get("autocalling")
                .and_then(Value::as_bool)
                .ok_or_else(|| bad("change_auto_calling", "missing `autocalling` bool"))?;
            InboundEvent::AutoCallingChanged {
                counter_id: data.get("counter_id").and_then(Value::as_i64),
                active,
            }
        }
        "update_auto_calling" => {
            let patient = data
                .get("patient")
                .cloned()
                .ok_or_else(|| bad("update_auto_calling", "missing `patient`"))?;
            InboundEvent::AutoCallingPatientArrived {
                counter_id: data.get("counter_id").and_then(Value::as_i64),
                patient: from_value("update_auto_calling", patient)?,
            }
        }
        "disconnect_user" => {
            let staff_name = data
                .get("staff")
                .and_then(Value::as_str)
                .ok_or_else(|| bad("disconnect_user", "missing `staff`"))?
                .to_string();
            InboundEvent::StaffDisconnectedByOther {
                counter_id: data.get("counter_id").and_then(Value::as_i64),
                staff_name,
            }
        }
        "refresh_after_clear_patient_list" => InboundEvent::PatientListCleared,
        // Forward compatibility: server-added kinds are not an error.
        _ => return Ok(None),
    };

    Ok(Some(event))
}

/// The `notification` kind nests a second envelope: its `flag` scopes the
/// notification to counters and its `data` carries the payload (which may be
/// double-encoded on its own).
fn classify_notification(data: Value) -> Result<InboundEvent, ClassifyError> {
    let scope = match data.get("flag") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => NotificationScope::Broadcast,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(id) => NotificationScope::ForCounter(id),
            None => return Err(bad("notification", "non-integer counter id")),
        },
        Some(Value::Array(items)) => {
            let mut ids = BTreeSet::new();
            for item in items {
                match item.as_i64() {
                    Some(id) => {
                        ids.insert(id);
                    }
                    None => return Err(bad("notification", "non-integer counter id in list")),
                }
            }
            NotificationScope::ForCounters(ids)
        }
        Some(_) => return Err(bad("notification", "unsupported `flag` shape")),
    };

    let payload = decode_twice(data.get("data").cloned().unwrap_or(Value::Null))?;
    let payload: NotificationPayload = from_value("notification", payload)?;

    Ok(InboundEvent::Notification { scope, payload })
}

/// Undo one level of double encoding: if the value is a string, decode it as
/// JSON. Non-string values pass through untouched.
fn decode_twice(value: Value) -> Result<Value, ClassifyError> {
    match value {
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(other),
    }
}

fn from_value<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    value: Value,
) -> Result<T, ClassifyError> {
    serde_json::from_value(value).map_err(|e| bad(kind, &e.to_string()))
}

fn bad(kind: &'static str, detail: &str) -> ClassifyError {
    ClassifyError::BadPayload {
        kind,
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patients_json() -> &'static str {
        r#"[{"id": 1, "call_number": "A-1", "activity": "Retrait", "status": "calling",
             "language_code": "fr", "activity_is_staff": false},
            {"id": 2, "call_number": "A-2", "activity": "Vaccin", "status": "ongoing",
             "language_code": "en", "activity_is_staff": 7}]"#
    }

    #[test]
    fn patient_list_already_decoded() {
        let raw = format!(r#"{{"flag": "update_patient_list", "data": {}}}"#, patients_json());
        let event = classify(&raw).unwrap().unwrap();
        match event {
            InboundEvent::PatientListUpdated { patients } => {
                assert_eq!(patients.len(), 2);
                assert_eq!(patients[0].call_number, "A-1");
                assert_eq!(patients[1].activity_is_staff, Some(7));
            }
            other => panic!("expected PatientListUpdated, got {other:?}"),
        }
    }

    #[test]
    fn patient_list_double_encoded_matches_plain() {
        let plain = format!(r#"{{"flag": "update_patient_list", "data": {}}}"#, patients_json());
        let doubled = serde_json::json!({
            "flag": "update_patient_list",
            "data": patients_json().to_string(),
        })
        .to_string();
        assert_eq!(
            classify(&plain).unwrap().unwrap(),
            classify(&doubled).unwrap().unwrap()
        );
    }

    #[test]
    fn my_patient_null_and_false_clear() {
        for data in ["null", "false"] {
            let raw = format!(r#"{{"flag": "my_patient", "data": {data}}}"#);
            let event = classify(&raw).unwrap().unwrap();
            assert_eq!(event, InboundEvent::CurrentPatientChanged { patient: None });
        }
    }

    #[test]
    fn my_patient_with_payload() {
        let raw = r#"{"flag": "my_patient",
                      "data": {"id": 5, "counter_id": 2, "call_number": "B-9",
                               "activity": "Conseil", "status": "ongoing"}}"#;
        match classify(raw).unwrap().unwrap() {
            InboundEvent::CurrentPatientChanged { patient: Some(p) } => {
                assert_eq!(p.id, Some(5));
                assert_eq!(p.counter_id, Some(2));
            }
            other => panic!("expected CurrentPatientChanged, got {other:?}"),
        }
    }

    #[test]
    fn notification_broadcast_when_flag_absent_or_null() {
        for raw in [
            r#"{"flag": "notification", "data": {"data": {"origin": "low_paper", "message": "m"}}}"#,
            r#"{"flag": "notification", "data": {"flag": null, "data": {"origin": "low_paper", "message": "m"}}}"#,
        ] {
            match classify(raw).unwrap().unwrap() {
                InboundEvent::Notification { scope, .. } => {
                    assert_eq!(scope, NotificationScope::Broadcast);
                }
                other => panic!("expected Notification, got {other:?}"),
            }
        }
    }

    #[test]
    fn notification_scoped_to_counter_set() {
        let raw = r#"{"flag": "notification",
                      "data": {"flag": [3, 5],
                               "data": {"origin": "please_validate", "message": "m"}}}"#;
        match classify(raw).unwrap().unwrap() {
            InboundEvent::Notification { scope, payload } => {
                assert!(scope.accepts(5));
                assert!(!scope.accepts(7));
                assert_eq!(payload.origin, "please_validate");
            }
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn notification_single_counter_scope() {
        let raw = r#"{"flag": "notification",
                      "data": {"flag": 4, "data": {"origin": "new_patient", "message": "m"}}}"#;
        match classify(raw).unwrap().unwrap() {
            InboundEvent::Notification { scope, .. } => {
                assert_eq!(scope, NotificationScope::ForCounter(4));
            }
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn notification_payload_double_encoded() {
        let raw = serde_json::json!({
            "flag": "notification",
            "data": {
                "flag": null,
                "data": r#"{"origin": "no_paper", "message": "plus de papier"}"#,
            },
        })
        .to_string();
        match classify(&raw).unwrap().unwrap() {
            InboundEvent::Notification { payload, .. } => {
                assert_eq!(payload.origin, "no_paper");
                assert_eq!(payload.message, "plus de papier");
            }
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn paper_and_auto_calling_flags() {
        let raw = r#"{"flag": "paper", "data": {"add_paper": true}}"#;
        assert_eq!(
            classify(raw).unwrap().unwrap(),
            InboundEvent::PaperStatusChanged { active: true }
        );

        let raw = r#"{"flag": "change_auto_calling", "data": {"counter_id": 2, "autocalling": false}}"#;
        assert_eq!(
            classify(raw).unwrap().unwrap(),
            InboundEvent::AutoCallingChanged {
                counter_id: Some(2),
                active: false
            }
        );
    }

    #[test]
    fn auto_calling_patient_arrived() {
        let raw = r#"{"flag": "update_auto_calling",
                      "data": {"counter_id": 2,
                               "patient": {"id": 9, "call_number": "C-3", "activity": "Retrait",
                                           "status": "calling"}}}"#;
        match classify(raw).unwrap().unwrap() {
            InboundEvent::AutoCallingPatientArrived { counter_id, patient } => {
                assert_eq!(counter_id, Some(2));
                assert_eq!(patient.call_number, "C-3");
            }
            other => panic!("expected AutoCallingPatientArrived, got {other:?}"),
        }
    }

    #[test]
    fn disconnect_user_event() {
        let raw = r#"{"flag": "disconnect_user", "data": {"counter_id": 1, "staff": "Marie"}}"#;
        assert_eq!(
            classify(raw).unwrap().unwrap(),
            InboundEvent::StaffDisconnectedByOther {
                counter_id: Some(1),
                staff_name: "Marie".to_string()
            }
        );
    }

    #[test]
    fn clear_list_event_has_no_payload() {
        let raw = r#"{"flag": "refresh_after_clear_patient_list", "data": null}"#;
        assert_eq!(
            classify(raw).unwrap().unwrap(),
            InboundEvent::PatientListCleared
        );
    }

    #[test]
    fn type_discriminator_accepted_as_alias() {
        let raw = r#"{"type": "paper", "data": {"add_paper": false}}"#;
        assert_eq!(
            classify(raw).unwrap().unwrap(),
            InboundEvent::PaperStatusChanged { active: false }
        );
    }

    #[test]
    fn unknown_discriminator_is_dropped_silently() {
        let raw = r#"{"type": "future_unknown_kind", "data": {"anything": 1}}"#;
        assert_eq!(classify(raw).unwrap(), None);
    }

    #[test]
    fn garbled_double_encoding_is_a_decode_error() {
        let raw = r#"{"flag": "update_patient_list", "data": "not json at all"}"#;
        assert!(matches!(classify(raw), Err(ClassifyError::BadJson(_))));
    }

    #[test]
    fn missing_discriminator_is_reported() {
        let raw = r#"{"data": {"add_paper": true}}"#;
        assert!(matches!(
            classify(raw),
            Err(ClassifyError::MissingDiscriminator)
        ));
    }
}
