//! Interval floors and defaults.
//!
//! A configured interval below its floor is replaced by the documented
//! default rather than clamped to the floor. Channels whose cadence doubles
//! as an enable switch keep zero and negative values verbatim so that they
//! read as "disabled".

use std::fmt;

/// Floor/default pair for one interval-shaped configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRule {
    /// JSON key the rule applies to.
    pub key: &'static str,
    /// Value used when the key is absent or configured below the floor.
    pub default: i64,
    /// Smallest accepted positive value.
    pub floor: i64,
    /// Whether zero or a negative value switches the owning channel off.
    pub disables_at_zero: bool,
}

impl IntervalRule {
    /// Resolves the effective value for a configured (or absent) interval.
    ///
    /// Returns the effective value and, when a substitution happened, the
    /// warning describing it. Nothing is logged here; the caller reports
    /// warnings once the configuration is accepted.
    #[must_use]
    pub fn resolve(&self, configured: Option<i64>) -> (i64, Option<ConfigWarning>) {
        let Some(value) = configured else {
            return (self.default, None);
        };
        if self.disables_at_zero && value <= 0 {
            return (value, None);
        }
        if value < self.floor {
            let warning = ConfigWarning::BelowFloor {
                key: self.key,
                configured: value,
                floor: self.floor,
                default: self.default,
            };
            return (self.default, Some(warning));
        }
        (value, None)
    }

    /// Returns whether an effective value enables the owning channel.
    #[must_use]
    pub fn enables(&self, effective: i64) -> bool {
        effective >= self.floor
    }
}

/// Non-fatal findings recorded while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A configured interval was below its floor and replaced by its default.
    BelowFloor {
        key: &'static str,
        configured: i64,
        floor: i64,
        default: i64,
    },
    /// A validation failure downgraded by lenient mode.
    Downgraded { message: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowFloor {
                key,
                configured,
                floor,
                default,
            } => write!(
                formatter,
                "{key}={configured} is below the floor of {floor}; using {default}"
            ),
            Self::Downgraded { message } => formatter.write_str(message),
        }
    }
}
