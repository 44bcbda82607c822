use std::thread;
use std::time::{Duration, Instant};

use futures::channel::oneshot;

pub const APP_TOKEN_HEADER: &str = "X-App-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully prepared request: url, optional form body, optional auth token.
/// Built by the endpoint catalog in `api`, executed here.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub form: Vec<(String, String)>,
    pub app_token: Option<String>,
}

/// Outcome of a one-shot HTTP call, always delivered, never thrown.
///
/// `status == 0` marks a transport-level failure (DNS, refused, timeout) as
/// opposed to a real HTTP error code, so callers can branch on one field.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub elapsed: Duration,
    pub body: String,
    pub status: u16,
}

impl HttpResponse {
    pub fn transport_failure(detail: String, elapsed: Duration) -> Self {
        HttpResponse {
            elapsed,
            body: detail,
            status: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Run the request on the calling thread and fold any failure into the
/// status-0 convention.
pub fn dispatch(client: &reqwest::blocking::Client, request: &ApiRequest) -> HttpResponse {
    let started = Instant::now();
    let builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url).form(&request.form),
    };
    let builder = match &request.app_token {
        Some(token) => builder.header(APP_TOKEN_HEADER, token),
        None => builder,
    };
    match builder.send() {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            HttpResponse {
                elapsed: started.elapsed(),
                body,
                status,
            }
        }
        Err(e) => {
            tracing::warn!("request to {} failed: {e}", request.url);
            HttpResponse::transport_failure(e.to_string(), started.elapsed())
        }
    }
}

/// Run the request on a short-lived worker thread and await its result from
/// the UI event loop. Workers are not cancellable: they run to completion
/// or failure and their response is posted back as a message.
pub async fn execute(client: reqwest::blocking::Client, request: ApiRequest) -> HttpResponse {
    let (tx, rx) = oneshot::channel();
    let spawned = thread::Builder::new().name("http-oneshot".into()).spawn(move || {
        let response = dispatch(&client, &request);
        let _ = tx.send(response);
    });
    if spawned.is_err() {
        return HttpResponse::transport_failure("failed to spawn worker".into(), Duration::ZERO);
    }
    match rx.await {
        Ok(response) => response,
        Err(_) => HttpResponse::transport_failure("worker dropped".into(), Duration::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_zero_is_transport_failure_not_success() {
        let response = HttpResponse::transport_failure("dns error".into(), Duration::ZERO);
        assert!(response.is_transport_failure());
        assert!(!response.is_success());
    }

    #[test]
    fn success_range_is_2xx_only() {
        for (status, ok) in [(200u16, true), (204, true), (299, true), (423, false), (500, false)] {
            let response = HttpResponse {
                elapsed: Duration::ZERO,
                body: String::new(),
                status,
            };
            assert_eq!(response.is_success(), ok, "status {status}");
        }
    }

    #[test]
    fn json_helper_tolerates_non_json_bodies() {
        let response = HttpResponse {
            elapsed: Duration::ZERO,
            body: "<html>teapot</html>".into(),
            status: 418,
        };
        assert!(response.json().is_none());
    }
}
