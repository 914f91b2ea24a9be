use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Business,
    Professional,
    Job,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Business => "business",
            PlanType::Professional => "professional",
            PlanType::Job => "job",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "business" => Some(PlanType::Business),
            "professional" => Some(PlanType::Professional),
            "job" => Some(PlanType::Job),
            _ => None,
        }
    }
}

impl Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
