//! Device-side bus bookkeeping.
//!
//! The USB controller raises reset, suspend, wakeup and VBUS interrupts
//! whether or not the host has configured the device. [`BusTracker`] filters
//! them down to the mount/unmount/suspend/resume callbacks: suspend and resume
//! are only reported while configured, and a bus reset or VBUS loss always
//! leaves the device awake and unconfigured.

use crate::report::HidCallbacks;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BusTracker {
    configured: bool,
    suspended: bool,
    remote_wakeup: bool,
}

impl BusTracker {
    pub const fn new() -> Self {
        Self {
            configured: false,
            suspended: false,
            remote_wakeup: false,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn remote_wakeup(&self) -> bool {
        self.remote_wakeup
    }

    /// SET_FEATURE / CLEAR_FEATURE(DEVICE_REMOTE_WAKEUP).
    pub fn set_remote_wakeup(&mut self, enabled: bool) {
        self.remote_wakeup = enabled;
    }

    /// End of bus reset.
    pub fn bus_reset<A: HidCallbacks>(&mut self, app: &mut A) {
        self.suspended = false;
        self.remote_wakeup = false;
        self.set_configured(app, false);
    }

    /// VBUS went away: the cable was pulled.
    pub fn vbus_lost<A: HidCallbacks>(&mut self, app: &mut A) {
        self.suspended = false;
        self.set_configured(app, false);
    }

    /// SET_CONFIGURATION with the given configuration value.
    pub fn set_configuration<A: HidCallbacks>(&mut self, app: &mut A, value: u8) {
        self.set_configured(app, value != 0);
    }

    /// Bus idle for more than 3 ms.
    pub fn suspend<A: HidCallbacks>(&mut self, app: &mut A) {
        if !self.configured || self.suspended {
            return;
        }
        self.suspended = true;
        app.on_suspend(self.remote_wakeup);
    }

    /// Bus activity after a suspend.
    pub fn wakeup<A: HidCallbacks>(&mut self, app: &mut A) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        if self.configured {
            app.on_resume();
        }
    }

    fn set_configured<A: HidCallbacks>(&mut self, app: &mut A, configured: bool) {
        if !configured {
            self.suspended = false;
        }
        if self.configured == configured {
            return;
        }
        self.configured = configured;
        if configured {
            app.on_mount();
        } else {
            app.on_unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{BlinkPolicy, ConnectionState, Indicator};
    use crate::report::ReportType;
    use crate::testing::{test_bindings, FakePlatform, TEST_LED};
    use crate::HidGpio;

    #[derive(Debug, PartialEq, Eq)]
    enum Seen {
        Mount,
        Unmount,
        Suspend(bool),
        Resume,
    }

    #[derive(Default)]
    struct Recorder(Vec<Seen>);

    impl HidCallbacks for Recorder {
        fn on_mount(&mut self) {
            self.0.push(Seen::Mount);
        }
        fn on_unmount(&mut self) {
            self.0.push(Seen::Unmount);
        }
        fn on_suspend(&mut self, remote_wakeup_enabled: bool) {
            self.0.push(Seen::Suspend(remote_wakeup_enabled));
        }
        fn on_resume(&mut self) {
            self.0.push(Seen::Resume);
        }
        fn on_set_report(&mut self, _: u8, _: u8, _: ReportType, _: &[u8]) {}
        fn on_get_report(&mut self, _: u8, _: u8, _: ReportType, _: &mut [u8]) -> usize {
            0
        }
    }

    #[test]
    fn test_plug_in_before_configuration_is_silent() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        // Idle bus before the host resets us, then reset with its wakeup.
        bus.suspend(&mut app);
        bus.bus_reset(&mut app);
        bus.wakeup(&mut app);

        assert!(app.0.is_empty());
        assert!(!bus.is_configured());
        assert!(!bus.is_suspended());
    }

    #[test]
    fn test_reset_while_suspended_unmounts_without_resume() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        bus.set_configuration(&mut app, 1);
        bus.suspend(&mut app);
        bus.bus_reset(&mut app);
        bus.wakeup(&mut app);

        assert_eq!(app.0, [Seen::Mount, Seen::Suspend(false), Seen::Unmount]);
        assert!(!bus.is_suspended());
    }

    #[test]
    fn test_vbus_loss_clears_suspend() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        bus.set_configuration(&mut app, 1);
        bus.suspend(&mut app);
        bus.vbus_lost(&mut app);
        bus.wakeup(&mut app);

        assert_eq!(app.0, [Seen::Mount, Seen::Suspend(false), Seen::Unmount]);
    }

    #[test]
    fn test_suspend_resume_while_configured() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        bus.set_configuration(&mut app, 1);
        bus.set_remote_wakeup(true);
        bus.suspend(&mut app);
        bus.suspend(&mut app);
        bus.wakeup(&mut app);
        bus.wakeup(&mut app);

        assert_eq!(app.0, [Seen::Mount, Seen::Suspend(true), Seen::Resume]);
    }

    #[test]
    fn test_bus_reset_disables_remote_wakeup() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        bus.set_remote_wakeup(true);
        bus.bus_reset(&mut app);
        assert!(!bus.remote_wakeup());
    }

    #[test]
    fn test_repeated_configuration_mounts_once() {
        let mut app = Recorder::default();
        let mut bus = BusTracker::new();

        bus.set_configuration(&mut app, 1);
        bus.set_configuration(&mut app, 1);
        bus.set_configuration(&mut app, 0);
        bus.set_configuration(&mut app, 0);

        assert_eq!(app.0, [Seen::Mount, Seen::Unmount]);
    }

    #[test]
    fn test_indicator_stays_in_reset_until_mounted() {
        let indicator = Indicator::new(TEST_LED, 1000, BlinkPolicy::StateDependent);
        let mut app = HidGpio::new(FakePlatform::new(), test_bindings(), indicator);
        let mut bus = BusTracker::new();

        bus.suspend(&mut app);
        bus.bus_reset(&mut app);
        bus.wakeup(&mut app);
        assert_eq!(app.connection_state(), ConnectionState::Reset);

        bus.set_configuration(&mut app, 1);
        assert_eq!(app.connection_state(), ConnectionState::Running);
    }
}
