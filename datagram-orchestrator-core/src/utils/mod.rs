//! Utility modules.

/// Timestamp serde helpers and activity-log formatting.
pub mod datetime;
/// Secret fingerprints.
pub mod fingerprint;

pub use datagram_orchestrator_github::log_sanitizer::mask_secret;
