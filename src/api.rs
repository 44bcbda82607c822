use crate::http::{ApiRequest, Method};

/// Endpoint catalog for the queue server.
///
/// Quick actions ride the plain GET routes; staff session management goes
/// through the authenticated `/app/counter/*` POST routes, which require
/// the `X-App-Token` obtained at startup.
#[derive(Debug, Clone)]
pub struct Api {
    base: String,
    app_token: Option<String>,
}

impl Api {
    pub fn new(web_url: &str) -> Self {
        Api {
            base: web_url.trim_end_matches('/').to_string(),
            app_token: None,
        }
    }

    pub fn set_app_token(&mut self, token: String) {
        self.app_token = Some(token);
    }

    pub fn has_app_token(&self) -> bool {
        self.app_token.is_some()
    }

    fn get(&self, path: String) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: format!("{}{}", self.base, path),
            form: Vec::new(),
            app_token: None,
        }
    }

    fn post(&self, path: String, form: Vec<(String, String)>) -> ApiRequest {
        ApiRequest {
            method: Method::Post,
            url: format!("{}{}", self.base, path),
            form,
            app_token: self.app_token.clone(),
        }
    }

    /// Validate the current patient (if any) and call the next one in line.
    pub fn call_next(&self, counter_id: i64) -> ApiRequest {
        self.get(format!("/validate_and_call_next/{counter_id}"))
    }

    /// Mark the bound patient as being served. 204 means nothing to
    /// validate, 423 means another counter claimed them first.
    pub fn validate_patient(&self, counter_id: i64, patient_id: i64) -> ApiRequest {
        self.get(format!("/validate_patient/{counter_id}/{patient_id}"))
    }

    /// Put the bound patient back into the waiting pool.
    pub fn pause_patient(&self, counter_id: i64, patient_id: i64) -> ApiRequest {
        self.get(format!("/pause_patient/{counter_id}/{patient_id}"))
    }

    /// Call a specific waiting patient out of order.
    pub fn call_specific_patient(&self, counter_id: i64, patient_id: i64) -> ApiRequest {
        self.get(format!("/call_specific_patient/{counter_id}/{patient_id}"))
    }

    /// Re-announce the current patient on the display screens.
    pub fn relaunch_patient_call(&self, counter_id: i64) -> ApiRequest {
        self.post(format!("/app/counter/relaunch_patient_call/{counter_id}"), Vec::new())
    }

    /// Who is logged in at this counter, if anyone.
    pub fn staff_on_counter(&self, counter_id: i64) -> ApiRequest {
        self.get(format!("/api/counter/is_staff_on_counter/{counter_id}"))
    }

    /// Which patient is bound to this counter, if any.
    pub fn patient_on_counter(&self, counter_id: i64) -> ApiRequest {
        self.get(format!("/api/counter/is_patient_on_counter/{counter_id}"))
    }

    /// Full waiting list snapshot, used at startup before the realtime
    /// channel takes over.
    pub fn patients_list(&self) -> ApiRequest {
        self.get("/api/patients_list_for_app".to_string())
    }

    /// Log staff in at this counter by initials. `logout_elsewhere` also
    /// releases any other counter the same initials hold.
    pub fn login_staff(&self, counter_id: i64, initials: &str, logout_elsewhere: bool) -> ApiRequest {
        self.post(
            "/app/counter/update_staff".to_string(),
            vec![
                ("initials".into(), initials.to_string()),
                ("counter_id".into(), counter_id.to_string()),
                ("deconnect".into(), logout_elsewhere.to_string()),
                ("app".into(), "true".into()),
            ],
        )
    }

    /// Release this counter's staff binding on the server.
    pub fn logout_staff(&self, counter_id: i64) -> ApiRequest {
        self.post(
            "/app/counter/remove_staff".to_string(),
            vec![("counter_id".into(), counter_id.to_string())],
        )
    }

    /// Announce this app instance and fetch counter bootstrap state
    /// (auto-calling flag among others).
    pub fn init_app(&self, counter_id: i64) -> ApiRequest {
        self.post(
            "/app/counter/init_app".to_string(),
            vec![("counter_id".into(), counter_id.to_string())],
        )
    }

    /// Trade the shared app secret for an `X-App-Token`. The only
    /// authenticated route that does not itself carry the token.
    pub fn request_app_token(&self, app_secret: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Post,
            url: format!("{}/api/get_app_token", self.base),
            form: vec![("app_secret".into(), app_secret.to_string())],
            app_token: None,
        }
    }
}
