pub mod blog_posts;
pub mod businesses;
pub mod enums;
pub mod external_reference;
pub mod job_applications;
pub mod jobs;
pub mod notifications;
pub mod pagination;
pub mod plans;
pub mod professionals;
pub mod reviews;
pub mod subscriptions;
pub mod users;
pub mod validation;
