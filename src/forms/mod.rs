pub mod points_trigger;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
}

/// Declaration of one form field, for a form renderer to draw and bind.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FieldSpec {
    pub name: String,
    /// Input name as submitted, `<form>[<field>]`
    pub full_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Decimal places accepted; 0 means integers only
    pub precision: u32,
    pub label: String,
    pub attr: BTreeMap<String, String>,
    pub label_attr: BTreeMap<String, String>,
    pub data: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("'{value}' is not a number")]
    NotANumber { value: String },

    #[error("'{value}' must be a whole number")]
    Fractional { value: String },
}

impl FieldSpec {
    /// Parses a submitted value. Blank input keeps the current value.
    pub fn bind(&self, raw: &str) -> Result<i64, FieldError> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(self.data);
        }

        if let Ok(n) = value.parse::<i64>() {
            return Ok(n);
        }

        let parsed = value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| FieldError::NotANumber {
                value: value.to_string(),
            })?;

        if self.precision == 0 && parsed.fract() != 0.0 {
            return Err(FieldError::Fractional {
                value: value.to_string(),
            });
        }

        if parsed < i64::MIN as f64 || parsed >= i64::MAX as f64 {
            return Err(FieldError::NotANumber {
                value: value.to_string(),
            });
        }

        Ok(parsed.round() as i64)
    }
}
