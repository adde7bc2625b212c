//! Firebase REST backend for coursehall.
//!
//! [`FirebaseBackend`] implements both admission collaborators:
//! - `IdentityVerifier` over the identity toolkit (`signInWithPassword` and
//!   `lookup`)
//! - `ProfileStore` over Firestore documents in a profiles collection keyed
//!   by identity id

pub mod auth;
pub mod backend;
pub mod config;
pub mod document;

pub use backend::FirebaseBackend;
pub use config::FirebaseConfig;
pub use document::Document;
