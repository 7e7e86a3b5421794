pub mod complex;
pub mod compute;
pub mod config;
pub mod error;
pub mod gc;
pub mod identity;
pub mod node;
pub mod normalize;
pub mod ops;
pub mod package;
pub mod radix;
pub mod scalar;
pub mod unique_table;

pub mod prelude {
    pub use crate::complex::{ComplexHandle, ComplexNumbers};
    pub use crate::config::PackageConfig;
    pub use crate::error::{QmddError, Result};
    pub use crate::node::{MatrixEdge, MatrixNodeRef, VectorEdge, VectorNodeRef};
    pub use crate::package::{Control, Package};
    pub use crate::radix::RadixTable;
    pub use crate::scalar::{ScalarHandle, ScalarStore};
}

pub use config::PackageConfig;
pub use error::{QmddError, Result};
pub use package::{Control, Package};
pub use radix::RadixTable;
