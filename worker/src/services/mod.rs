pub mod email_templates;
pub mod outbox_worker;
