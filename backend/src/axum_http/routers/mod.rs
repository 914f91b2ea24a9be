pub mod admin;
pub mod auth;
pub mod identity_webhooks;
pub mod listings;
pub mod payments;
