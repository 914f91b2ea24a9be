use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::{
        payment_methods::PaymentMethod, payment_statuses::PaymentStatus,
    },
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub payment_method: String,
    pub preference_id: Option<String>,
    pub external_reference: String,
    pub provider_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_str(&self.status)
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        PaymentMethod::from_str(&self.payment_method)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i32,
    pub status: String,
    pub payment_method: String,
    pub preference_id: Option<String>,
    pub external_reference: String,
}

/// Fields written when a gateway notification settles a payment.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct UpdatePaymentStatusEntity {
    pub status: String,
    pub provider_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
