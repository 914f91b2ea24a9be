pub mod gateway_payment_statuses;
pub mod listing_statuses;
pub mod notification_kinds;
pub mod payment_methods;
pub mod payment_statuses;
pub mod plan_types;
pub mod subscription_statuses;
pub mod user_roles;
pub mod user_statuses;
