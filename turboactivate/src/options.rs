//! Options for the extended genuine check.

use crate::flags::GenuineFlags;

/// Recommended interval between server checks.
pub const RECOMMENDED_DAYS_BETWEEN_CHECKS: u32 = 90;

/// Recommended grace period after a network failure.
pub const RECOMMENDED_GRACE_DAYS: u32 = 14;

/// Settings for a genuine check.
///
/// All fields default to zero. A zeroed value selects the basic genuine
/// check; anything else selects the extended check carrying this payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GenuineOptions {
    flags: GenuineFlags,
    days_between_checks: u32,
    grace_days: u32,
}

impl GenuineOptions {
    /// Creates zeroed options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: GenuineFlags::empty(),
            days_between_checks: 0,
            grace_days: 0,
        }
    }

    /// Options with the recommended 90 day interval and 14 day grace period.
    #[must_use]
    pub const fn recommended() -> Self {
        Self {
            flags: GenuineFlags::empty(),
            days_between_checks: RECOMMENDED_DAYS_BETWEEN_CHECKS,
            grace_days: RECOMMENDED_GRACE_DAYS,
        }
    }

    /// Sets the behaviour flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: GenuineFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets how often, in days, the server is contacted.
    #[must_use]
    pub const fn with_days_between_checks(mut self, days: u32) -> Self {
        self.days_between_checks = days;
        self
    }

    /// Sets how long, in days, a network failure is tolerated.
    #[must_use]
    pub const fn with_grace_days(mut self, days: u32) -> Self {
        self.grace_days = days;
        self
    }

    #[must_use]
    pub const fn flags(&self) -> GenuineFlags {
        self.flags
    }

    #[must_use]
    pub const fn days_between_checks(&self) -> u32 {
        self.days_between_checks
    }

    #[must_use]
    pub const fn grace_days(&self) -> u32 {
        self.grace_days
    }

    /// Returns true when no option is set.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.flags.is_empty() && self.days_between_checks == 0 && self.grace_days == 0
    }

    /// Builds the record passed by reference to the extended check.
    #[must_use]
    pub fn to_raw(&self) -> RawGenuineOptions {
        RawGenuineOptions {
            n_length: std::mem::size_of::<RawGenuineOptions>() as u32,
            flags: self.flags.bits(),
            n_days_between_checks: self.days_between_checks,
            n_grace_days_on_inet_err: self.grace_days,
        }
    }
}

/// C layout of the genuine-check options record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGenuineOptions {
    /// Size of this struct in bytes.
    pub n_length: u32,
    pub flags: u32,
    pub n_days_between_checks: u32,
    pub n_grace_days_on_inet_err: u32,
}
