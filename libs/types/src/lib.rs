//! Types library for the live sales service
//!
//! This library provides the core type definitions shared by the sales
//! aggregation service, ensuring type safety and deterministic money
//! arithmetic.
//!
//! # Modules
//! - `ids`: Identifiers (ProductId, RegionId)
//! - `numeric`: Fixed-point decimal money (Amount) and coercion helpers
//! - `sale`: The validated SaleEvent and timestamp parsing
//! - `errors`: Event validation error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod sale;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::sale::*;
    pub use crate::errors::*;
}
