use std::net::TcpStream;
use std::time::Duration;

use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How long a blocking read waits before yielding an idle tick. Keeps the
/// supervisor loop responsive to `stop()` while connected.
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Sub-channel the queue server pushes counter events on.
pub const COUNTER_CHANNEL: &str = "/socket_app_counter";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Blocking transport for the realtime channel.
///
/// Abstracted behind a trait so the supervisor state machine can be driven
/// by a scripted mock in tests.
pub trait Transport {
    /// Open the channel, identifying this client via the `X-Client-Name`
    /// header.
    fn connect(&mut self, url: &str, client_name: &str) -> Result<(), TransportError>;

    /// Wait for the next inbound frame.
    ///
    /// `Ok(Some(text))` is a text message; `Ok(None)` is an idle tick (poll
    /// timeout or a control frame) and the caller should simply loop.
    /// `Err(_)` means the connection is gone.
    fn read(&mut self) -> Result<Option<String>, TransportError>;

    /// Tear the connection down. Errors during close are ignored: the
    /// connection is considered gone either way.
    fn close(&mut self);
}

/// Derive the realtime channel URL from the configured web URL.
pub fn channel_url(web_url: &str) -> String {
    let base = if let Some(rest) = web_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = web_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        web_url.to_string()
    };
    format!("{}{}", base.trim_end_matches('/'), COUNTER_CHANNEL)
}

/// Production transport over tungstenite.
pub struct WsTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        WsTransport { socket: None }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    fn connect(&mut self, url: &str, client_name: &str) -> Result<(), TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        if let Ok(value) = HeaderValue::from_str(client_name) {
            request.headers_mut().insert("X-Client-Name", value);
        }

        let (socket, _response) = tungstenite::connect(request)
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        // Poll timeout on the raw stream so read() wakes up periodically and
        // the supervisor can observe its stop flag.
        let set_timeout = |stream: &TcpStream| {
            if let Err(e) = stream.set_read_timeout(Some(READ_POLL_TIMEOUT)) {
                tracing::warn!("failed to set read timeout: {e}");
            }
        };
        let mut socket = socket;
        match socket.get_mut() {
            MaybeTlsStream::Plain(stream) => set_timeout(stream),
            MaybeTlsStream::Rustls(tls) => set_timeout(&tls.sock),
            _ => {}
        }

        self.socket = Some(socket);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<String>, TransportError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;

        match socket.read() {
            Ok(Message::Text(text)) => Ok(Some(text.to_string())),
            // Control and binary frames are not part of the counter protocol.
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.socket = None;
                Err(TransportError::ConnectionClosed)
            }
            Err(e) => {
                self.socket = None;
                Err(TransportError::ReceiveFailed(e.to_string()))
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
        }
    }
}
