pub mod classifier;
pub mod transport;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures::channel::mpsc::UnboundedSender;

use crate::events::InboundEvent;
use transport::{Transport, WsTransport};

/// How often interruptible sleeps re-check the stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Connection lifecycle as surfaced to the UI.
///
/// `Disconnected -> Connecting` on an attempt, `Connecting -> Connected` on
/// handshake success; a failed attempt ticks back to `Disconnected` with the
/// attempt counter incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything the supervisor thread reports to the UI loop.
#[derive(Debug, Clone)]
pub enum RealtimeUpdate {
    /// Connection state transition. `notify` is advisory: the grace timer in
    /// the UI is the sole authority for the disconnect alarm, so only the
    /// reconnect-success case consults it.
    StateChanged {
        state: ConnectionState,
        attempts: u32,
        notify: bool,
    },
    /// Low-level loss signal feeding the disconnection grace timer. Emitted
    /// on the initial drop (attempts 0) and after every failed reconnect.
    ConnectionLost { attempts: u32 },
    /// A classified server event.
    Event(InboundEvent),
}

/// Reconnection backoff: linear in the attempt count, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempts: u32) -> Duration {
        (self.base_delay * attempts).min(self.max_delay)
    }
}

/// Handle to a running supervisor thread.
///
/// Dropping the handle detaches the thread (it exits on its own once the UI
/// side of the channel is gone); `stop()` is the deterministic teardown path.
pub struct SupervisorHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Request shutdown and block until the supervisor thread has exited.
    /// No reconnection attempt survives this call.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("supervisor thread panicked during shutdown");
            }
        }
    }
}

/// Spawn the connect/retry loop on its own thread. At most one live
/// transport connection exists per spawned supervisor.
pub fn start(
    url: String,
    client_name: String,
    policy: RetryPolicy,
    tx: UnboundedSender<RealtimeUpdate>,
) -> SupervisorHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    let join = thread::Builder::new()
        .name("realtime-supervisor".into())
        .spawn(move || {
            run_loop(WsTransport::new(), &url, &client_name, policy, &tx, &stop_flag);
            tracing::info!("realtime supervisor stopped");
        })
        .ok();
    SupervisorHandle { stop, join }
}

/// The supervisor state machine. Runs until `stop` is raised or the UI drops
/// its receiver; transport errors only drive the retry path, never a panic
/// or an early return.
fn run_loop<T: Transport>(
    mut transport: T,
    url: &str,
    client_name: &str,
    policy: RetryPolicy,
    tx: &UnboundedSender<RealtimeUpdate>,
    stop: &AtomicBool,
) {
    let mut attempts: u32 = 0;

    'retry: while !stop.load(Ordering::Relaxed) {
        if emit(
            tx,
            RealtimeUpdate::StateChanged {
                state: ConnectionState::Connecting,
                attempts,
                notify: false,
            },
        )
        .is_err()
        {
            break;
        }

        match transport.connect(url, client_name) {
            Ok(()) => {
                attempts = 0;
                tracing::info!("realtime channel connected");
                if emit(
                    tx,
                    RealtimeUpdate::StateChanged {
                        state: ConnectionState::Connected,
                        attempts: 0,
                        notify: true,
                    },
                )
                .is_err()
                {
                    break;
                }

                loop {
                    if stop.load(Ordering::Relaxed) {
                        transport.close();
                        break 'retry;
                    }
                    match transport.read() {
                        Ok(Some(text)) => match classifier::classify(&text) {
                            Ok(Some(event)) => {
                                if emit(tx, RealtimeUpdate::Event(event)).is_err() {
                                    transport.close();
                                    break 'retry;
                                }
                            }
                            Ok(None) => {
                                tracing::debug!("ignoring unrecognized event kind");
                            }
                            Err(e) => {
                                // Malformed payloads never tear the channel down.
                                tracing::warn!("dropping undecodable message: {e}");
                            }
                        },
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!("realtime connection lost: {e}");
                            let lost = [
                                RealtimeUpdate::StateChanged {
                                    state: ConnectionState::Disconnected,
                                    attempts: 0,
                                    notify: false,
                                },
                                RealtimeUpdate::ConnectionLost { attempts: 0 },
                            ];
                            for update in lost {
                                if emit(tx, update).is_err() {
                                    break 'retry;
                                }
                            }
                            continue 'retry;
                        }
                    }
                }
            }
            Err(e) => {
                attempts += 1;
                tracing::warn!("connect attempt {attempts} failed: {e}");
                let failed = [
                    RealtimeUpdate::StateChanged {
                        state: ConnectionState::Disconnected,
                        attempts,
                        notify: false,
                    },
                    RealtimeUpdate::ConnectionLost { attempts },
                ];
                for update in failed {
                    if emit(tx, update).is_err() {
                        break 'retry;
                    }
                }
                if !sleep_interruptible(policy.delay(attempts), stop) {
                    break;
                }
            }
        }
    }

    transport.close();
}

fn emit(tx: &UnboundedSender<RealtimeUpdate>, update: RealtimeUpdate) -> Result<(), ()> {
    tx.unbounded_send(update).map_err(|_| ())
}

/// Sleep in short slices, returning false if `stop` was raised meanwhile.
fn sleep_interruptible(total: Duration, stop: &AtomicBool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let slice = remaining.min(STOP_POLL);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    !stop.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::transport::TransportError;
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn backoff_is_linear_and_capped() {
        let policy = RetryPolicy::default();
        for n in 1..=5 {
            assert_eq!(policy.delay(n), Duration::from_secs(5 * n as u64));
        }
        // Attempt 6 and beyond all hit the cap.
        for n in 6..=20 {
            assert_eq!(policy.delay(n), Duration::from_secs(30));
        }
    }

    /// Scripted transport: pops connect outcomes, then read outcomes for the
    /// successful connections. Raises the shared stop flag once the script
    /// is exhausted so the loop terminates without real delays.
    struct MockTransport {
        connects: VecDeque<bool>,
        reads: VecDeque<Result<Option<String>, ()>>,
        stop: Arc<AtomicBool>,
    }

    impl Transport for MockTransport {
        fn connect(&mut self, _url: &str, _name: &str) -> Result<(), TransportError> {
            match self.connects.pop_front() {
                Some(true) => Ok(()),
                Some(false) => Err(TransportError::ConnectionFailed("refused".into())),
                None => {
                    self.stop.store(true, Ordering::Relaxed);
                    Err(TransportError::ConnectionFailed("script exhausted".into()))
                }
            }
        }

        fn read(&mut self) -> Result<Option<String>, TransportError> {
            match self.reads.pop_front() {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(())) | None => Err(TransportError::ConnectionClosed),
            }
        }

        fn close(&mut self) {}
    }

    fn drive(connects: Vec<bool>, reads: Vec<Result<Option<String>, ()>>) -> Vec<RealtimeUpdate> {
        let stop = Arc::new(AtomicBool::new(false));
        let transport = MockTransport {
            connects: connects.into(),
            reads: reads.into(),
            stop: Arc::clone(&stop),
        };
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        let policy = RetryPolicy {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        run_loop(transport, "ws://test", "Counter 1 App", policy, &tx, &stop);
        drop(tx);

        let mut updates = Vec::new();
        while let Ok(Some(update)) = rx.try_next() {
            updates.push(update);
        }
        updates
    }

    fn states(updates: &[RealtimeUpdate]) -> Vec<(ConnectionState, u32)> {
        updates
            .iter()
            .filter_map(|u| match u {
                RealtimeUpdate::StateChanged { state, attempts, .. } => Some((*state, *attempts)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn attempt_counter_increments_on_failures() {
        let updates = drive(vec![false, false], vec![]);
        let states = states(&updates);
        assert_eq!(states[0], (ConnectionState::Connecting, 0));
        assert_eq!(states[1], (ConnectionState::Disconnected, 1));
        assert_eq!(states[2], (ConnectionState::Connecting, 1));
        assert_eq!(states[3], (ConnectionState::Disconnected, 2));
    }

    #[test]
    fn attempt_counter_resets_on_success() {
        // Two failures, a successful connection that drops immediately, then
        // another failure: the post-reconnect failure must count from 1
        // again, not continue from 2.
        let updates = drive(vec![false, false, true, false], vec![Err(())]);
        let states = states(&updates);
        assert!(states.contains(&(ConnectionState::Connected, 0)));
        let connected_at = states
            .iter()
            .position(|s| *s == (ConnectionState::Connected, 0))
            .unwrap();
        // Drop detected with the counter reset...
        assert_eq!(states[connected_at + 1], (ConnectionState::Disconnected, 0));
        // ...and the next failed attempt is attempt 1.
        assert_eq!(states[connected_at + 3], (ConnectionState::Disconnected, 1));
    }

    #[test]
    fn loss_signal_fires_on_drop_and_on_failed_attempts() {
        let updates = drive(vec![true, false], vec![Err(())]);
        let lost: Vec<u32> = updates
            .iter()
            .filter_map(|u| match u {
                RealtimeUpdate::ConnectionLost { attempts } => Some(*attempts),
                _ => None,
            })
            .collect();
        assert_eq!(lost[0], 0); // initial drop
        assert_eq!(lost[1], 1); // first failed reconnect
    }

    #[test]
    fn inbound_frames_become_typed_events() {
        let frame = r#"{"flag": "paper", "data": {"add_paper": true}}"#;
        let updates = drive(vec![true], vec![Ok(Some(frame.to_string())), Err(())]);
        assert!(updates.iter().any(|u| matches!(
            u,
            RealtimeUpdate::Event(InboundEvent::PaperStatusChanged { active: true })
        )));
    }

    #[test]
    fn undecodable_and_unknown_frames_keep_the_channel_open() {
        let updates = drive(
            vec![true],
            vec![
                Ok(Some("{\"flag\": \"update_patient_list\", \"data\": \"garbage\"}".into())),
                Ok(Some("{\"flag\": \"future_unknown_kind\", \"data\": 1}".into())),
                Ok(Some("{\"flag\": \"refresh_after_clear_patient_list\"}".into())),
                Err(()),
            ],
        );
        let events: Vec<_> = updates
            .iter()
            .filter(|u| matches!(u, RealtimeUpdate::Event(_)))
            .collect();
        // Only the well-formed message survives.
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn stop_before_connect_exits_immediately() {
        let stop = Arc::new(AtomicBool::new(true));
        let transport = MockTransport {
            connects: VecDeque::new(),
            reads: VecDeque::new(),
            stop: Arc::clone(&stop),
        };
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        run_loop(
            transport,
            "ws://test",
            "Counter 1 App",
            RetryPolicy::default(),
            &tx,
            &stop,
        );
        drop(tx);
        assert!(rx.try_next().unwrap().is_none());
    }

    #[test]
    fn stop_tears_down_a_live_supervisor() {
        use futures::StreamExt;

        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        let handle = start(
            // Nothing listens here; every attempt is refused right away.
            "ws://127.0.0.1:1".into(),
            "Counter 1 App".into(),
            RetryPolicy {
                base_delay: Duration::from_millis(50),
                max_delay: Duration::from_millis(50),
            },
            tx,
        );
        let first = futures::executor::block_on(rx.next());
        assert!(matches!(
            first,
            Some(RealtimeUpdate::StateChanged {
                state: ConnectionState::Connecting,
                ..
            })
        ));
        // Joins the thread; hangs forever if the stop flag is ignored.
        handle.stop();
    }
}
