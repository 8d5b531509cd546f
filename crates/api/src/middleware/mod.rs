//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated caller, from a JWT bearer token.

pub mod auth;
