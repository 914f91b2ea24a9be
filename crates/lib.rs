pub mod domain;
pub mod identity;
pub mod infra;
pub mod observability;
pub mod payments;
pub mod retry;
