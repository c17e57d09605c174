//! Telemetry sources for the operator console.
//!
//! The real controller feed arrives through a vendor SDK; the console
//! talks to anything implementing [`RcSource`] so it can run against a
//! deterministic sweep when no hardware is attached.

use std::collections::VecDeque;
use std::time::Duration;

use bridge::{FiveWayStatus, ModeSwitchPosition, RcKey, RcValue};
use log::info;
use servo::{STICK_MAX, STICK_MIN};

/// A stream of remote-controller samples, delivered one at a time in
/// arrival order.
pub trait RcSource {
    /// Whether the source has finished registering and can deliver
    /// samples.
    fn is_ready(&self) -> bool;

    /// Next sample, or `None` when the stream is exhausted.
    fn poll(&mut self) -> Option<(RcKey, RcValue)>;
}

/// How many times to check source readiness before giving up.
pub const READY_CHECKS: u32 = 10;
/// Pause between readiness checks.
pub const READY_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Poll the source until it reports ready, up to [`READY_CHECKS`]
/// attempts spaced by `interval`. Returns false on timeout.
pub fn wait_ready(source: &impl RcSource, interval: Duration) -> bool {
    for attempt in 1..=READY_CHECKS {
        if source.is_ready() {
            return true;
        }
        info!(
            "telemetry source not ready, waiting... ({}/{})",
            attempt, READY_CHECKS
        );
        std::thread::sleep(interval);
    }
    false
}

/// Deterministic stand-in for the controller: sweeps the left stick
/// across its full domain and exercises the buttons, dials, mode switch
/// and five-way pad along the way.
pub struct SweepSource {
    script: VecDeque<(RcKey, RcValue)>,
}

impl SweepSource {
    pub fn new() -> Self {
        let mut script = VecDeque::new();
        script.push_back((RcKey::Connection, RcValue::Connected(true)));
        script.push_back((
            RcKey::FlightModeSwitch,
            RcValue::Mode(ModeSwitchPosition::Two),
        ));

        // full sweep out and back on the left stick
        let mut value = STICK_MIN;
        while value <= STICK_MAX {
            script.push_back((RcKey::StickLeftHorizontal, RcValue::Axis(value)));
            value = value.saturating_add(60);
        }
        script.push_back((RcKey::StickLeftHorizontal, RcValue::Axis(STICK_MAX)));

        for key in [
            RcKey::ShutterButton,
            RcKey::RecordButton,
            RcKey::GoHomeButton,
            RcKey::PauseButton,
            RcKey::CustomButton1,
        ] {
            script.push_back((key, RcValue::Button(true)));
            script.push_back((key, RcValue::Button(false)));
        }

        script.push_back((RcKey::LeftDial, RcValue::Axis(220)));
        script.push_back((RcKey::RightDial, RcValue::Axis(-140)));
        script.push_back((RcKey::ScrollWheel, RcValue::Axis(35)));

        script.push_back((
            RcKey::FiveWayPad,
            RcValue::FiveWay(FiveWayStatus {
                up: true,
                ..Default::default()
            }),
        ));
        script.push_back((RcKey::FiveWayPad, RcValue::FiveWay(FiveWayStatus::default())));

        let mut value = STICK_MAX;
        while value >= STICK_MIN {
            script.push_back((RcKey::StickLeftHorizontal, RcValue::Axis(value)));
            value = value.saturating_sub(60);
        }
        script.push_back((RcKey::StickLeftHorizontal, RcValue::Axis(0)));

        SweepSource { script }
    }
}

impl Default for SweepSource {
    fn default() -> Self {
        SweepSource::new()
    }
}

impl RcSource for SweepSource {
    fn is_ready(&self) -> bool {
        true
    }

    fn poll(&mut self) -> Option<(RcKey, RcValue)> {
        self.script.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverReady;

    impl RcSource for NeverReady {
        fn is_ready(&self) -> bool {
            false
        }

        fn poll(&mut self) -> Option<(RcKey, RcValue)> {
            None
        }
    }

    #[test]
    fn test_wait_ready_immediate() {
        assert!(wait_ready(&SweepSource::new(), Duration::ZERO));
    }

    #[test]
    fn test_wait_ready_times_out() {
        assert!(!wait_ready(&NeverReady, Duration::ZERO));
    }

    #[test]
    fn test_sweep_announces_connection_first() {
        let mut source = SweepSource::new();
        assert_eq!(
            source.poll(),
            Some((RcKey::Connection, RcValue::Connected(true)))
        );
    }

    #[test]
    fn test_sweep_covers_full_stick_domain() {
        let mut source = SweepSource::new();
        let mut min_seen = i16::MAX;
        let mut max_seen = i16::MIN;
        while let Some((key, value)) = source.poll() {
            if key == RcKey::StickLeftHorizontal {
                if let RcValue::Axis(v) = value {
                    min_seen = min_seen.min(v);
                    max_seen = max_seen.max(v);
                }
            }
        }
        assert_eq!(min_seen, STICK_MIN);
        assert_eq!(max_seen, STICK_MAX);
    }

    #[test]
    fn test_sweep_is_finite() {
        let mut source = SweepSource::new();
        let mut count = 0;
        while source.poll().is_some() {
            count += 1;
            assert!(count < 10_000, "sweep script should be finite");
        }
        assert!(count > 0);
    }
}
