//! Error types for WLG benchmark runs
//!
//! Configuration and job-spec construction errors are fatal and surface before
//! any generator process is launched. Per-job failures are never errors here;
//! they are recorded as [`crate::outcome::JobOutcome`] data.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// One failing validation rule found while loading a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingField {
        field: String,
    },
    NonPositiveRuntime {
        runtime_hours: i64,
    },
    /// A count-like field holds a fraction, a negative, an out-of-range
    /// number or a non-number.
    NotWholeNumber {
        field: String,
        value: String,
    },
    NonPositivePowerLimit {
        watts: String,
    },
    NoPatterns,
    InvalidBlockSize {
        context: String,
        value: String,
    },
    PercentageOutOfRange {
        direction: String,
        block_size: String,
        percentage: u32,
    },
    PercentageSum {
        direction: String,
        total: u32,
    },
    ZeroQueueDepth {
        direction: String,
        block_size: String,
    },
    UnknownDirection {
        value: String,
    },
    /// A capacity tier's write table names a block size no write pattern uses.
    UnknownTierBlockSize {
        tier: String,
        block_size: String,
    },
    InvalidTarget {
        target: String,
        value: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "missing required field: {field}"),
            Self::NonPositiveRuntime { runtime_hours } => {
                write!(f, "runtime_hours must be > 0, got {runtime_hours}")
            }
            Self::NotWholeNumber { field, value } => {
                write!(f, "{field} must be a non-negative whole number, got {value}")
            }
            Self::NonPositivePowerLimit { watts } => {
                write!(f, "power_limit_watts must be > 0, got {watts}")
            }
            Self::NoPatterns => f.write_str("profile declares no I/O patterns"),
            Self::InvalidBlockSize { context, value } => {
                write!(f, "invalid block size {value:?} in {context}")
            }
            Self::PercentageOutOfRange {
                direction,
                block_size,
                percentage,
            } => write!(
                f,
                "{direction} {block_size}: percentage must be within 1..=100, got {percentage}"
            ),
            Self::PercentageSum { direction, total } => write!(
                f,
                "{direction} pattern percentages must sum to 100, got {total}"
            ),
            Self::ZeroQueueDepth {
                direction,
                block_size,
            } => write!(f, "{direction} {block_size}: queue_depth must be > 0"),
            Self::UnknownDirection { value } => {
                write!(f, "unknown I/O direction {value:?} (expected read, write or mixed)")
            }
            Self::UnknownTierBlockSize { tier, block_size } => write!(
                f,
                "tier {tier} sets a write target for block size {block_size}, \
                 but no write pattern uses it"
            ),
            Self::InvalidTarget { target, value } => {
                write!(f, "target {target} must be a finite non-negative number, got {value}")
            }
        }
    }
}

/// Every validation failure found in one profile document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("profile validation failed ({} issue(s)): {}", .issues.len(), join_issues(.issues))]
pub struct ConfigValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure loading a profile from disk or text.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),

    #[error("cannot read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse profile: {0}")]
    Parse(String),
}

/// Job-spec construction failure. Aborts the run before any process starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unknown capacity tier {tier:?} (profile defines: {known})")]
    UnknownTier { tier: String, known: String },

    #[error("no write throughput target for block size {block_size} in tier {tier}")]
    UnknownBlockSize { block_size: String, tier: String },

    #[error("duplicate job {0}: two patterns share direction, block size and tier")]
    DuplicateJob(String),
}

/// Failure reading one instantaneous power value from a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowerReadError {
    #[error("power sensor unavailable: {0}")]
    Unavailable(String),

    #[error("power sensor command failed: {0}")]
    Command(String),

    #[error("unparseable power reading: {0:?}")]
    Unparseable(String),
}

/// Umbrella error for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ConfigValidationError> for Error {
    fn from(err: ConfigValidationError) -> Self {
        Self::Profile(ProfileError::Validation(err))
    }
}

impl Error {
    /// Returns the error type string (for JSON output)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Profile(ProfileError::Validation(_)) => "CONFIG_VALIDATION",
            Self::Profile(ProfileError::Parse(_)) => "CONFIG_PARSE",
            Self::Profile(ProfileError::Io { .. }) | Self::Io(_) => "OS_ERROR",
            Self::Build(BuildError::UnknownBlockSize { .. }) => "UNKNOWN_BLOCK_SIZE",
            Self::Build(BuildError::UnknownTier { .. }) => "UNKNOWN_TIER",
            Self::Build(BuildError::DuplicateJob(_)) => "DUPLICATE_JOB",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for errors the operator fixes by editing the profile or arguments.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Profile(_) | Self::Build(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ConfigValidationError {
            issues: vec![
                ValidationIssue::MissingField {
                    field: "profile_id".to_string(),
                },
                ValidationIssue::PercentageSum {
                    direction: "read".to_string(),
                    total: 90,
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 issue(s)"), "{msg}");
        assert!(msg.contains("profile_id"), "{msg}");
        assert!(msg.contains("sum to 100, got 90"), "{msg}");
    }

    #[test]
    fn error_type_codes_are_stable() {
        let err: Error = BuildError::UnknownBlockSize {
            block_size: "8k".to_string(),
            tier: "64TB".to_string(),
        }
        .into();
        assert_eq!(err.error_type(), "UNKNOWN_BLOCK_SIZE");
        assert!(err.is_config_error());

        let err: Error = ConfigValidationError { issues: vec![] }.into();
        assert_eq!(err.error_type(), "CONFIG_VALIDATION");

        let err: Error = std::io::Error::other("disk gone").into();
        assert_eq!(err.error_type(), "OS_ERROR");
        assert!(!err.is_config_error());
    }

    #[test]
    fn validation_issue_serializes_with_rule_tag() {
        let issue = ValidationIssue::UnknownTierBlockSize {
            tier: "16TB".to_string(),
            block_size: "8k".to_string(),
        };
        let json = serde_json::to_value(&issue).expect("json");
        assert_eq!(json["rule"], "unknown_tier_block_size");
        assert_eq!(json["tier"], "16TB");
    }
}
