pub mod blog_posts;
pub mod businesses;
pub mod cancellation_reasons;
pub mod invoices;
pub mod job_applications;
pub mod jobs;
pub mod notification_outbox;
pub mod payments;
pub mod plans;
pub mod professionals;
pub mod reviews;
pub mod subscriptions;
pub mod users;
pub mod webhook_receipts;
