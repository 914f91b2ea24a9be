pub mod admin_dashboard;
pub mod errors;
pub mod identity_sync;
pub mod owned_resources;
pub mod payment_gateway;
pub mod payments;
pub mod plans;
pub mod users;
