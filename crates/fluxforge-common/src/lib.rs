//! Fluxforge-Common: Shared error types and particle-code utilities.
//!
//! This crate provides common functionality used across fluxforge:
//!
//! - **Error Handling**: the unified error type and result alias
//! - **PDG Codes**: human-readable names for particle species codes
//!
//! # Examples
//!
//! ```
//! use fluxforge_common::{pdg, Error, Result};
//!
//! assert_eq!(pdg::label(14), "nu_mu");
//!
//! fn example() -> Result<()> {
//!     Err(Error::meta_not_found(3))
//! }
//! ```

pub mod error;
pub mod pdg;

pub use error::{Error, Result};
