//! Utility modules: clock, log-safe fingerprints.

pub mod clock;
pub mod fingerprint;
