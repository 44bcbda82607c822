use std::time::{Duration, Instant};

/// Default window a dropped connection has to come back before the user is
/// alerted.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Debounces connection-loss alarms.
///
/// The realtime supervisor reports every loss and failed reconnect; this
/// watchdog decides when the user actually gets told. The first loss arms a
/// deadline; losses while armed only refresh the attempt count. When the
/// deadline passes, `poll` fires exactly once. A reconnect disarms
/// everything and reports whether an alarm had been shown, so the caller
/// knows whether a "connection restored" toast is owed.
#[derive(Debug)]
pub struct DisconnectWatchdog {
    grace: Duration,
    deadline: Option<Instant>,
    alarm_shown: bool,
    last_attempts: u32,
}

impl DisconnectWatchdog {
    pub fn new(grace: Duration) -> Self {
        DisconnectWatchdog {
            grace,
            deadline: None,
            alarm_shown: false,
            last_attempts: 0,
        }
    }

    /// Record a loss signal. Arms the grace deadline on the first signal of
    /// an outage; later signals only update the reconnect attempt count.
    pub fn on_connection_lost(&mut self, attempts: u32, now: Instant) {
        self.last_attempts = attempts;
        if self.deadline.is_none() && !self.alarm_shown {
            self.deadline = Some(now + self.grace);
        }
    }

    /// Check the deadline. Returns the latest attempt count when the grace
    /// window has just expired, once per outage.
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.alarm_shown = true;
                Some(self.last_attempts)
            }
            _ => None,
        }
    }

    /// The connection is back. Returns true if an alarm had been shown for
    /// this outage, i.e. the recovery is worth announcing.
    pub fn on_connected(&mut self) -> bool {
        let was_shown = self.alarm_shown;
        self.deadline = None;
        self.alarm_shown = false;
        self.last_attempts = 0;
        was_shown
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_shown
    }
}

impl Default for DisconnectWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_within_grace_stays_silent() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        assert_eq!(wd.poll(t0 + Duration::from_secs(9)), None);
        // Back before the deadline: no alarm, and no recovery announcement.
        assert!(!wd.on_connected());
        assert_eq!(wd.poll(t0 + Duration::from_secs(11)), None);
    }

    #[test]
    fn alarm_fires_once_after_grace_expiry() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        wd.on_connection_lost(1, t0 + Duration::from_secs(5));
        wd.on_connection_lost(2, t0 + Duration::from_secs(9));

        // Fires with the latest attempt count, exactly once.
        assert_eq!(wd.poll(t0 + Duration::from_secs(10)), Some(2));
        assert_eq!(wd.poll(t0 + Duration::from_secs(20)), None);
        assert!(wd.alarm_active());
    }

    #[test]
    fn losses_during_outage_do_not_extend_deadline() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        // A failed reconnect at t+8 must not push the deadline to t+18.
        wd.on_connection_lost(1, t0 + Duration::from_secs(8));
        assert_eq!(wd.poll(t0 + Duration::from_secs(10)), Some(1));
    }

    #[test]
    fn recovery_after_alarm_is_announced() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        assert!(wd.poll(t0 + Duration::from_secs(10)).is_some());
        assert!(wd.on_connected());
        assert!(!wd.alarm_active());
    }

    #[test]
    fn new_outage_after_recovery_rearms() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        assert!(wd.poll(t0 + Duration::from_secs(10)).is_some());
        wd.on_connected();

        let t1 = t0 + Duration::from_secs(60);
        wd.on_connection_lost(0, t1);
        assert_eq!(wd.poll(t1 + Duration::from_secs(9)), None);
        assert_eq!(wd.poll(t1 + Duration::from_secs(10)), Some(0));
    }

    #[test]
    fn no_alarm_rearm_while_outage_persists_after_firing() {
        let mut wd = DisconnectWatchdog::new(Duration::from_secs(10));
        let t0 = Instant::now();
        wd.on_connection_lost(0, t0);
        assert!(wd.poll(t0 + Duration::from_secs(10)).is_some());
        // Further failed reconnects must not re-arm a second alarm.
        wd.on_connection_lost(3, t0 + Duration::from_secs(15));
        assert_eq!(wd.poll(t0 + Duration::from_secs(30)), None);
    }
}
