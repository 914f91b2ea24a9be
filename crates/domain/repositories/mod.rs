pub mod admin_stats;
pub mod backup_storage;
pub mod constraint_violations;
pub mod invoices;
pub mod listing_activation;
pub mod mailer;
pub mod notification_outbox;
pub mod owned_resources;
pub mod payments;
pub mod plans;
pub mod subscriptions;
pub mod users;
pub mod webhook_receipts;
