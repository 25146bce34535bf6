//! HEIMDALL monitoring core facade.
//!
//! Depend on this crate via `cargo add zora-heimdall`. It bundles the
//! monitoring subsystems behind feature flags so deployments can enable only
//! the pieces they run.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use heimdall_primitives as primitives;

/// Per-agent trace rings and health scoring (enabled by `telemetry`).
#[cfg(feature = "telemetry")]
pub use heimdall_telemetry as telemetry;

/// Alert rules, evaluation, and lifecycle (enabled by `alerts`).
#[cfg(feature = "alerts")]
pub use heimdall_alerts as alerts;

/// Failure linkage and cascade risk (enabled by `causal`).
#[cfg(feature = "causal")]
pub use heimdall_causal as causal;

/// Agent-to-agent communication drift detection (enabled by `drift`).
#[cfg(feature = "drift")]
pub use heimdall_drift as drift;

/// Circuit breakers, quarantine, and remediation (enabled by `protocol`).
#[cfg(feature = "protocol")]
pub use heimdall_protocol as protocol;

/// Snapshot persistence (enabled by `store`).
#[cfg(feature = "store")]
pub use heimdall_store as store;

/// Configuration loading and validation (enabled by `config`).
#[cfg(feature = "config")]
pub use heimdall_config as config;

/// The composition root wiring every subsystem (enabled by `kernel`).
#[cfg(feature = "kernel")]
pub use heimdall_kernel as kernel;
