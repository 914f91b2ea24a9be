use std::borrow::Cow;

use serde::Serialize;
use validator::{ValidationError, ValidationErrors};

use crate::domain::value_objects::enums::{
    payment_methods::PaymentMethod, plan_types::PlanType, user_roles::UserRole,
    user_statuses::UserStatus,
};

/// Struct-level checks report under this key in `ValidationErrors`.
const STRUCT_LEVEL: &str = "__all__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Flattens `validator` output into `{field, message}` pairs ordered by field.
/// Struct-level errors name their field through the error code.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut flat: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| FieldError {
                field: if field == STRUCT_LEVEL {
                    error.code.to_string()
                } else {
                    field.clone()
                },
                message: message_for(error),
            })
        })
        .collect();
    flat.sort_by(|a, b| a.field.cmp(&b.field));
    flat
}

fn message_for(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let min = error.params.get("min");
    let max = error.params.get("max");
    match error.code.as_ref() {
        "length" => match (min, max) {
            (Some(min), Some(max)) => format!("must be between {min} and {max} characters"),
            (None, Some(max)) => format!("must be at most {max} characters"),
            (Some(min), None) => format!("must be at least {min} characters"),
            (None, None) => "has an invalid length".to_string(),
        },
        "range" => match (min, max) {
            (Some(min), Some(max)) => format!("must be between {min} and {max}"),
            (None, Some(max)) => format!("must be at most {max}"),
            (Some(min), None) => format!("must be at least {min}"),
            (None, None) => "is out of range".to_string(),
        },
        "url" => "must be a valid URL".to_string(),
        code => code.to_string(),
    }
}

pub fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn one_of(value: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    let mut error = ValidationError::new("one_of");
    error.message = Some(Cow::Owned(format!(
        "must be one of: {}",
        allowed.join(", ")
    )));
    Err(error)
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "is required"));
    }
    Ok(())
}

pub fn valid_slug(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value.len() <= 200
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(invalid(
            "slug",
            "must contain only lowercase letters, digits and dashes",
        ));
    }
    Ok(())
}

pub fn iso_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("currency", "must be a 3 letter ISO code"));
    }
    Ok(())
}

pub fn known_payment_method(value: &str) -> Result<(), ValidationError> {
    match PaymentMethod::from_str(value) {
        Some(_) => Ok(()),
        None => one_of(value, &["credit_card", "pix", "boleto"]),
    }
}

pub fn known_plan_type(value: &str) -> Result<(), ValidationError> {
    match PlanType::from_str(value) {
        Some(_) => Ok(()),
        None => one_of(value, &["business", "professional", "job"]),
    }
}

pub fn known_user_role(value: &str) -> Result<(), ValidationError> {
    match UserRole::from_str(value) {
        Some(_) => Ok(()),
        None => one_of(
            value,
            &["user", "admin", "editor", "business", "professional"],
        ),
    }
}

pub fn known_user_status(value: &str) -> Result<(), ValidationError> {
    match UserStatus::from_str(value) {
        Some(_) => Ok(()),
        None => one_of(value, &["pending", "approved"]),
    }
}

pub fn known_job_type(value: &str) -> Result<(), ValidationError> {
    one_of(
        value,
        &["full_time", "part_time", "contract", "temporary", "internship"],
    )
}

pub fn known_job_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["open", "closed"])
}

pub fn known_post_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, &["draft", "published", "archived"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Debug, Validate)]
    #[validate(schema(function = "name_or_website", skip_on_field_errors = false))]
    struct Listing {
        #[validate(custom(function = "not_blank"), length(max = 10))]
        name: String,
        #[validate(range(min = 1, max = 5))]
        rating: i32,
        #[validate(url)]
        website: Option<String>,
    }

    fn name_or_website(listing: &Listing) -> Result<(), ValidationError> {
        if listing.name.trim().is_empty() && listing.website.is_none() {
            return Err(invalid("website", "name or website is required"));
        }
        Ok(())
    }

    #[test]
    fn collects_every_failing_field_in_order() {
        let listing = Listing {
            name: "   ".to_string(),
            rating: 7,
            website: None,
        };

        let failures = field_errors(&listing.validate().unwrap_err());
        let fields: Vec<_> = failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "rating", "website"]);
        assert_eq!(failures[0].message, "is required");
        assert_eq!(failures[1].message, "must be between 1 and 5");
        assert_eq!(failures[2].message, "name or website is required");
    }

    #[test]
    fn length_and_url_get_readable_messages() {
        let listing = Listing {
            name: "a very long listing name".to_string(),
            rating: 3,
            website: Some("not a url".to_string()),
        };

        let failures = field_errors(&listing.validate().unwrap_err());
        assert_eq!(
            failures,
            vec![
                FieldError {
                    field: "name".to_string(),
                    message: "must be at most 10 characters".to_string(),
                },
                FieldError {
                    field: "website".to_string(),
                    message: "must be a valid URL".to_string(),
                },
            ]
        );
    }

    #[test]
    fn enum_backed_checks_list_the_allowed_values() {
        assert!(known_payment_method("pix").is_ok());
        let error = known_payment_method("cash").unwrap_err();
        assert_eq!(
            error.message.as_deref(),
            Some("must be one of: credit_card, pix, boleto")
        );
        assert!(valid_slug("hello-world-2").is_ok());
        assert!(valid_slug("Hello World").is_err());
        assert!(iso_currency("brl").is_ok());
        assert!(iso_currency("R$").is_err());
    }
}
