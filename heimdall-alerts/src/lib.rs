//! Gjallarhorn: rule-based alerting over monitoring evidence.
//!
//! Rules pair a condition (threshold, anomaly, pattern, or cascade) with a
//! severity and a cooldown. The engine evaluates a batch of evidence against
//! every registered rule; a rule that fires is silenced for its cooldown.

#![warn(missing_docs, clippy::pedantic)]

mod alert;
mod evidence;
mod rule;
mod system;

pub use alert::{Alert, AlertId, AlertStatus};
pub use evidence::Evidence;
pub use rule::{AlertCondition, AlertRule, AlertSeverity, MetricOp};
pub use system::GjallarhornAlerts;

use thiserror::Error;

/// Result alias for alerting operations.
pub type AlertResult<T> = Result<T, AlertError>;

/// Errors surfaced by the alert engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Rule definition failed validation.
    #[error("invalid alert rule: {0}")]
    InvalidRule(&'static str),
    /// A rule with the same identifier is already registered.
    #[error("duplicate alert rule `{id}`")]
    DuplicateRule {
        /// Identifier of the conflicting rule.
        id: String,
    },
    /// No alert with the supplied identifier exists.
    #[error("unknown alert `{id}`")]
    UnknownAlert {
        /// The identifier that failed to resolve.
        id: AlertId,
    },
    /// The alert was already resolved.
    #[error("alert `{id}` already resolved")]
    AlreadyResolved {
        /// Identifier of the alert.
        id: AlertId,
    },
}
