//! Launch detection and run-at-login registration
//!
//! The boot heuristic decides whether this process was most likely started
//! by the login autorun rather than by the user, by comparing the process
//! start time with the system boot time.

#[cfg(windows)]
mod platform;
pub(crate) mod registrar;

#[cfg(windows)]
pub use platform::{process_start_time, RunKeyRegistrar, UptimeBootClock};
pub use registrar::{run_command, StartupRegistrar};

use crate::error::Result;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Default window after boot in which a launch counts as automatic
pub const DEFAULT_THRESHOLD_MINUTES: u32 = 5;

/// Source of the system boot timestamp
pub trait BootTimeProvider {
    /// Query the time the system last booted.
    ///
    /// Fails with [`GuardError::BootQueryUnavailable`](crate::GuardError::BootQueryUnavailable)
    /// when the platform cannot answer.
    fn query(&self) -> Result<SystemTime>;
}

/// Process start and boot timestamps taken once at launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSample {
    pub process_start_time: SystemTime,
    pub system_boot_time: SystemTime,
}

impl BootSample {
    /// Time from boot to process start.
    ///
    /// `None` when the process appears to have started before boot, which
    /// only happens with clock skew between the two sources.
    pub fn elapsed(&self) -> Option<Duration> {
        self.process_start_time
            .duration_since(self.system_boot_time)
            .ok()
    }

    /// Whether the process started within `threshold` of boot
    pub fn is_within(&self, threshold: Duration) -> bool {
        self.elapsed().is_some_and(|elapsed| elapsed < threshold)
    }
}

/// Guess whether this process was launched by the system at boot.
///
/// Returns `false` whenever the answer is uncertain: the boot time query
/// failed, or the process start precedes the boot time (clock skew).
pub fn was_auto_started_at_boot(
    process_start_time: SystemTime,
    boot_time: &dyn BootTimeProvider,
    threshold_minutes: u32,
) -> bool {
    let system_boot_time = match boot_time.query() {
        Ok(time) => time,
        Err(e) => {
            debug!("Assuming manual start: {}", e);
            return false;
        }
    };

    let sample = BootSample {
        process_start_time,
        system_boot_time,
    };
    let threshold = Duration::from_secs(u64::from(threshold_minutes) * 60);
    let auto_started = sample.is_within(threshold);

    match sample.elapsed() {
        Some(elapsed) => debug!(
            "Process started {}s after boot (threshold {}min): auto-started = {}",
            elapsed.as_secs(),
            threshold_minutes,
            auto_started
        ),
        None => debug!("Process start precedes boot time, assuming manual start"),
    }
    auto_started
}

/// Classify the current launch when the process start time itself may be
/// unknown. An unknown start time counts as a manual launch.
pub fn launched_at_boot(
    process_start_time: Result<SystemTime>,
    boot_time: &dyn BootTimeProvider,
    threshold_minutes: u32,
) -> bool {
    match process_start_time {
        Ok(start) => was_auto_started_at_boot(start, boot_time, threshold_minutes),
        Err(e) => {
            debug!("Assuming manual start: {}", e);
            false
        }
    }
}

/// Seconds between 1601-01-01 (Windows FILETIME epoch) and the Unix epoch
const FILETIME_UNIX_OFFSET_SECS: u64 = 11_644_473_600;

/// Convert a count of 100ns ticks since 1601-01-01 into a `SystemTime`.
///
/// Returns `None` for timestamps before the Unix epoch.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn system_time_from_filetime_ticks(ticks: u64) -> Option<SystemTime> {
    let since_1601 = Duration::from_secs(ticks / 10_000_000)
        + Duration::from_nanos((ticks % 10_000_000) * 100);
    let since_unix = since_1601.checked_sub(Duration::from_secs(FILETIME_UNIX_OFFSET_SECS))?;
    SystemTime::UNIX_EPOCH.checked_add(since_unix)
}


#[cfg(test)]
mod tests {
    use super::testing::FixedBootClock;
    use super::*;

    fn boot() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_760_000_000)
    }

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn test_started_shortly_after_boot() {
        let clock = FixedBootClock(Some(boot()));
        assert!(was_auto_started_at_boot(boot() + minutes(2), &clock, 5));
        assert!(was_auto_started_at_boot(boot() + minutes(1), &clock, 5));
    }

    #[test]
    fn test_started_long_after_boot() {
        let clock = FixedBootClock(Some(boot()));
        assert!(!was_auto_started_at_boot(boot() + minutes(10), &clock, 5));
        assert!(!was_auto_started_at_boot(boot() + minutes(30), &clock, 5));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let clock = FixedBootClock(Some(boot()));
        assert!(!was_auto_started_at_boot(boot() + minutes(5), &clock, 5));
        assert!(was_auto_started_at_boot(
            boot() + minutes(5) - Duration::from_millis(1),
            &clock,
            5
        ));
    }

    #[test]
    fn test_boot_time_unavailable() {
        let clock = FixedBootClock(None);
        assert!(!was_auto_started_at_boot(boot() + minutes(1), &clock, 5));
    }

    #[test]
    fn test_clock_skew_is_manual_start() {
        let clock = FixedBootClock(Some(boot()));
        assert!(!was_auto_started_at_boot(boot() - minutes(1), &clock, 5));

        let sample = BootSample {
            process_start_time: boot() - minutes(1),
            system_boot_time: boot(),
        };
        assert_eq!(sample.elapsed(), None);
        assert!(!sample.is_within(minutes(5)));
    }

    #[test]
    fn test_unknown_process_start_is_manual_start() {
        // Freshly booted machine, but the process start time cannot be read
        let clock = FixedBootClock(Some(SystemTime::now() - minutes(1)));
        let start = Err(crate::GuardError::BootQueryUnavailable(
            "GetProcessTimes failed".into(),
        ));
        assert!(!launched_at_boot(start, &clock, 5));

        assert!(launched_at_boot(Ok(boot() + minutes(1)), &FixedBootClock(Some(boot())), 5));
    }

    #[test]
    fn test_filetime_ticks_conversion() {
        // 2025-01-01T00:00:00Z as a FILETIME
        let ticks = 133_801_632_000_000_000u64;
        assert_eq!(
            system_time_from_filetime_ticks(ticks),
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_735_689_600))
        );
        assert_eq!(
            system_time_from_filetime_ticks(ticks + 5),
            Some(SystemTime::UNIX_EPOCH + Duration::from_nanos(1_735_689_600_000_000_500))
        );
        assert_eq!(system_time_from_filetime_ticks(0), None);
    }

    #[test]
    fn test_zero_threshold_never_matches() {
        let clock = FixedBootClock(Some(boot()));
        assert!(!was_auto_started_at_boot(boot(), &clock, 0));
    }
}
