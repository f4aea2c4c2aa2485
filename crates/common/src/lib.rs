//! Common types for the Google OAuth client

mod secret;

pub use secret::Secret;
