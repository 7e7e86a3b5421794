use serde::{Deserialize, Serialize};

/// Default tolerance below which two real values are treated as equal.
///
/// Assumes double precision; implementations targeting single precision must
/// raise this accordingly, or scalar canonicity (P3) stops holding.
pub const DEFAULT_TOLERANCE: f64 = 1e-13;

/// Default slot count for the binary-operation compute tables (add, multiply,
/// transpose, inner product).
pub const DEFAULT_COMPUTE_TABLE_SIZE: usize = 32_768;

/// Default slot count for the Kronecker compute table.
pub const DEFAULT_KRONECKER_TABLE_SIZE: usize = 4_096;

/// Tuning knobs for a [`Package`](crate::Package).
///
/// A plain, `Default`-able struct the caller can tweak before constructing
/// the package it governs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Tolerance `τ` for scalar and complex approximate equality.
    pub tolerance: f64,
    /// Capacity of each binary-operation compute table.
    pub compute_table_size: usize,
    /// Capacity of the Kronecker compute table.
    pub kronecker_table_size: usize,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            compute_table_size: DEFAULT_COMPUTE_TABLE_SIZE,
            kronecker_table_size: DEFAULT_KRONECKER_TABLE_SIZE,
        }
    }
}
