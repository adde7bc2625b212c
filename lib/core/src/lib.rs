//! Core types and utilities shared by the coursehall crates.
//!
//! This crate provides the identifier types and the error handling
//! foundation used by the admission core and its backend adapters.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{IdentityId, ParseIdError};
