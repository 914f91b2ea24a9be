use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::plans::{InsertPlanEntity, PlanEntity, UpdatePlanEntity},
    value_objects::{
        enums::plan_types::PlanType,
        validation::{iso_currency, known_plan_type, not_blank},
    },
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PlanFeatures(pub Vec<String>);

impl PlanFeatures {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.0.clone())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub currency: String,
    pub duration_days: i32,
    pub plan_type: PlanType,
    pub features: PlanFeatures,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            price_minor: value.price_minor,
            currency: value.currency,
            duration_days: value.duration_days,
            plan_type: value.plan_type,
            features: value.features,
            is_active: value.is_active,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanModel {
    #[validate(custom(function = "not_blank"), length(max = 120))]
    pub name: String,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100_000_000))]
    pub price_minor: i32,
    #[validate(custom(function = "iso_currency"))]
    pub currency: Option<String>,
    #[validate(range(min = 1, max = 3660))]
    pub duration_days: i32,
    #[validate(custom(function = "known_plan_type"))]
    pub plan_type: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub is_active: Option<bool>,
}

impl CreatePlanModel {
    pub fn to_entity(&self) -> InsertPlanEntity {
        InsertPlanEntity {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            price_minor: self.price_minor,
            currency: self
                .currency
                .clone()
                .unwrap_or_else(|| "BRL".to_string())
                .to_ascii_uppercase(),
            duration_days: self.duration_days,
            plan_type: self.plan_type.clone(),
            features: PlanFeatures(self.features.clone()).to_json(),
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlanModel {
    #[validate(custom(function = "not_blank"), length(max = 120))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 100_000_000))]
    pub price_minor: Option<i32>,
    #[validate(range(min = 1, max = 3660))]
    pub duration_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdatePlanModel {
    pub fn to_entity(&self) -> UpdatePlanEntity {
        UpdatePlanEntity {
            name: self.name.as_ref().map(|name| name.trim().to_string()),
            description: self.description.clone(),
            price_minor: self.price_minor,
            duration_days: self.duration_days,
            features: self
                .features
                .as_ref()
                .map(|features| PlanFeatures(features.clone()).to_json()),
            is_active: self.is_active,
            updated_at: Some(Utc::now()),
        }
    }
}
