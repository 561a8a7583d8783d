//! Error type for domain-system construction and state restore.

/// Errors fatal to building or restoring a domain system (per spec §7,
/// distinct from an ordinary `apply` failure, which is reported in-band via
/// `DomainApplyResult::success`).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// `applyState` was given a payload that doesn't deserialize into this
    /// system's captured shape.
    #[error("domain state is malformed: {0}")]
    MalformedState(String),
}
