//! # Storyloom Core
//!
//! Domain types, the budgeting algorithms, and the content provider trait
//! for the Storyloom context assembly engine. Storage and assembly live in
//! their own crates and depend inward on this one.
//!
//! ## Pipeline
//!
//! - [`token`] estimates the size of mixed-script text
//! - [`budget`] divides a total across weighted [`Category`] slices
//! - [`truncate`] cuts text to a category's ceiling
//! - [`content`] defines the cached, storage-backed provider each category reads from

pub mod budget;
pub mod category;
pub mod content;
pub mod error;
pub mod token;
pub mod truncate;

// Re-export key types at crate root for ergonomics
pub use budget::{Allocation, Budget, allocate};
pub use category::{Category, CategoryWeights};
pub use content::{ContentProvider, Edit};
pub use error::{ConfigError, Error, Result, StoreError};
pub use token::{Estimator, TokenTally, estimate, estimate_fast};
pub use truncate::{Truncated, truncate};
