use std::io::BufRead;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::mpsc;
use futures::{Stream, StreamExt};

use crate::app::Message;
use crate::realtime::{self, RealtimeUpdate, RetryPolicy, SupervisorHandle};
use crate::theme::ThemeMode;

pub(crate) fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("pharma-counter.sock")
}

/// Line-command control socket. Lets shortcut daemons and scripts drive the
/// quick actions without touching the panel.
pub(crate) fn socket_listener() -> impl futures::Stream<Item = Message> {
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || {
        let path = socket_path();
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("failed to bind socket {path:?}: {e}");
                return;
            }
        };
        tracing::info!("listening on {path:?}");
        for stream in listener.incoming().flatten() {
            let mut buf = String::new();
            if std::io::BufReader::new(stream).read_line(&mut buf).is_ok() {
                let msg = match buf.trim() {
                    "toggle" => Some(Message::TogglePanel),
                    "call-next" => Some(Message::CallNext),
                    "validate" => Some(Message::ValidatePatient),
                    "pause" => Some(Message::PausePatient),
                    "recall" => Some(Message::RecallPatient),
                    "logout" => Some(Message::Logout),
                    "test-notification" => Some(Message::TestNotification),
                    "theme dark" => Some(Message::ThemeSet(ThemeMode::Dark)),
                    "theme light" => Some(Message::ThemeSet(ThemeMode::Light)),
                    cmd if cmd.starts_with("login ") => {
                        Some(Message::LoginAs(cmd[6..].trim().to_string()))
                    }
                    other => {
                        tracing::warn!("unknown command: {other:?}");
                        None
                    }
                };
                if let Some(msg) = msg {
                    if tx.unbounded_send(msg).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

pub(crate) fn tick_stream(ms: &u64) -> mpsc::UnboundedReceiver<Message> {
    let ms = *ms;
    let (tx, rx) = mpsc::unbounded();
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_millis(ms));
        if tx.unbounded_send(Message::Tick).is_err() {
            break;
        }
    });
    rx
}

// --- Realtime subscription bridge ---

/// Subscription key for the realtime channel; a config change that alters
/// it tears the old supervisor down and starts a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RealtimeKey {
    pub url: String,
    pub client_name: String,
}

/// Supervisor updates surfaced as messages. Owns the supervisor handle:
/// when iced tears the subscription down (key change, shutdown), dropping
/// this stream stops the supervisor and joins its thread.
pub(crate) struct RealtimeMessages {
    rx: mpsc::UnboundedReceiver<RealtimeUpdate>,
    supervisor: Option<SupervisorHandle>,
}

impl Stream for RealtimeMessages {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        let this = self.get_mut();
        this.rx
            .poll_next_unpin(cx)
            .map(|update| update.map(Message::Realtime))
    }
}

impl Drop for RealtimeMessages {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.stop();
        }
    }
}

/// Bridge the supervisor thread into the event loop.
pub(crate) fn realtime_stream(key: &RealtimeKey) -> RealtimeMessages {
    let (tx, rx) = mpsc::unbounded();
    let supervisor = realtime::start(
        key.url.clone(),
        key.client_name.clone(),
        RetryPolicy::default(),
        tx,
    );
    RealtimeMessages {
        rx,
        supervisor: Some(supervisor),
    }
}
