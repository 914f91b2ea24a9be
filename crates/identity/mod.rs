//! Clients and strategies for verifying credentials issued by the external
//! identity provider.

pub mod jwks;
pub mod legacy_session;
pub mod revocation;
pub mod signed_token;
pub mod verifier;
pub mod webhook_signature;
