/// Errors that can cross the [`Package`](crate::Package) boundary.
///
/// Invariant violations (a normalization post-condition failing, a child whose
/// variable isn't `parent.var - 1`, a cached weight escaping a recursion
/// boundary) are not represented here — per the propagation policy, those are
/// fatal and surface as a `panic!` with a diagnostic, never as a `Result`.
#[derive(Debug, thiserror::Error)]
pub enum QmddError {
    /// A register count, level, target, or control ordering was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested operation addresses registers beyond the configured range.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A unique table or scalar store ran out of capacity.
    #[error("allocation failed: {0}")]
    Allocation(String),
}

pub type Result<T> = std::result::Result<T, QmddError>;
