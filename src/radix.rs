use crate::error::{QmddError, Result};

/// Minimum supported radix (a binary / qubit register).
pub const MIN_RADIX: u8 = 2;
/// Maximum supported radix (a qusept register).
pub const MAX_RADIX: u8 = 7;

/// The immutable radix assignment for every register in a [`Package`](crate::Package).
///
/// `RadixTable` holds one entry per register, `R[i] = dᵢ ∈ [2, 7]`. Register `i`
/// addresses the `i`-th wire from the bottom of the diagram; variable index `-1`
/// is reserved for terminal nodes and never appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadixTable {
    radices: Vec<u8>,
}

impl RadixTable {
    /// Builds a radix table, validating that every entry is in `[2, 7]`.
    pub fn new(radices: impl Into<Vec<u8>>) -> Result<Self> {
        let radices = radices.into();
        for (i, &d) in radices.iter().enumerate() {
            if !(MIN_RADIX..=MAX_RADIX).contains(&d) {
                return Err(QmddError::InvalidArgument(format!(
                    "register {i} has radix {d}, outside the supported range [{MIN_RADIX}, {MAX_RADIX}]"
                )));
            }
        }
        Ok(Self { radices })
    }

    /// A uniform radix table: `n` registers, each with radix `d`.
    pub fn uniform(n: usize, d: u8) -> Result<Self> {
        Self::new(vec![d; n])
    }

    pub fn register_count(&self) -> usize {
        self.radices.len()
    }

    /// The radix `dᵢ` of register `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of range; callers that accept external register
    /// indices should validate with [`RadixTable::check_register`] first.
    pub fn radix(&self, i: usize) -> u8 {
        self.radices[i]
    }

    pub fn check_register(&self, i: usize) -> Result<()> {
        if i >= self.radices.len() {
            return Err(QmddError::OutOfRange(format!(
                "register {i} exceeds the configured register count {}",
                self.radices.len()
            )));
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.radices
    }
}
