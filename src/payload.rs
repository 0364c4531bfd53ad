//! JSON request bodies and per-field validation.
//!
//! Write endpoints take a [`Payload`] (any JSON object) and read typed values
//! out of it through [`Fields`], which collects every problem it meets into
//! a [`FieldErrors`] map instead of stopping at the first one.

use std::str::FromStr;

use axum::extract::{FromRequest, Request};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{AppError, FieldErrors};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";

#[derive(Debug, Clone, Default)]
pub struct Payload(pub Map<String, Value>);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        match value {
            Value::Object(map) => Ok(Payload(map)),
            other => Err(AppError::BadRequest(format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(&other)
            ))),
        }
    }
}

impl Payload {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Cursor over a payload for one create/update request.
///
/// With `partial` set (PATCH), a missing field falls back to the stored
/// value instead of being reported as required.
pub struct Fields<'a> {
    payload: &'a Payload,
    partial: bool,
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    pub fn new(payload: &'a Payload, partial: bool) -> Self {
        Self {
            payload,
            partial,
            errors: FieldErrors::new(),
        }
    }

    pub fn reject(&mut self, name: &str, message: impl Into<String>) {
        self.errors
            .entry(name.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }

    /// The raw value, or `None` after recording why there is nothing usable.
    fn value<T>(&mut self, name: &str, current: Option<T>) -> Result<&'a Value, Option<T>> {
        let payload = self.payload;
        match payload.get(name) {
            Some(Value::Null) => {
                self.reject(name, NOT_NULL);
                Err(None)
            }
            Some(value) => Ok(value),
            None if self.partial && current.is_some() => Err(current),
            None => {
                self.reject(name, REQUIRED);
                Err(None)
            }
        }
    }

    /// A required, non-blank string, trimmed.
    pub fn string(
        &mut self,
        name: &str,
        max_len: Option<usize>,
        current: Option<&str>,
    ) -> Option<String> {
        let value = match self.value(name, current) {
            Ok(value) => value,
            Err(fallback) => return fallback.map(str::to_string),
        };

        let Some(text) = value.as_str() else {
            self.reject(name, "Not a valid string.");
            return None;
        };

        let text = text.trim();
        if text.is_empty() {
            self.reject(name, NOT_BLANK);
            return None;
        }
        if let Some(max) = max_len {
            if text.chars().count() > max {
                self.reject(
                    name,
                    format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        Some(text.to_string())
    }

    /// An optional string that may be blank. Missing means `current`, or empty.
    pub fn optional_string(
        &mut self,
        name: &str,
        max_len: usize,
        current: Option<&str>,
    ) -> Option<String> {
        let payload = self.payload;
        match payload.get(name) {
            None | Some(Value::Null) => Some(current.unwrap_or_default().to_string()),
            Some(Value::String(text)) => {
                let text = text.trim();
                if text.chars().count() > max_len {
                    self.reject(
                        name,
                        format!("Ensure this field has no more than {max_len} characters."),
                    );
                    return None;
                }
                Some(text.to_string())
            }
            Some(_) => {
                self.reject(name, "Not a valid string.");
                None
            }
        }
    }

    /// A required primary-key reference, as an integer or numeric string.
    pub fn id(&mut self, name: &str, current: Option<i64>) -> Option<i64> {
        let value = match self.value(name, current) {
            Ok(value) => value,
            Err(fallback) => return fallback,
        };
        self.parse_id(name, value)
    }

    /// A primary-key reference that falls back to `default` when omitted.
    pub fn id_or(&mut self, name: &str, default: i64) -> Option<i64> {
        let payload = self.payload;
        match payload.get(name) {
            None => Some(default),
            Some(Value::Null) => {
                self.reject(name, NOT_NULL);
                None
            }
            Some(value) => self.parse_id(name, value),
        }
    }

    fn parse_id(&mut self, name: &str, value: &Value) -> Option<i64> {
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.reject(
                name,
                format!(
                    "Incorrect type. Expected pk value, received {}.",
                    type_name(value)
                ),
            );
        }
        parsed
    }

    /// A non-negative fixed-point number with at most `max_digits` digits,
    /// `places` of them after the decimal point.
    pub fn decimal(
        &mut self,
        name: &str,
        max_digits: u32,
        places: u32,
        current: Option<Decimal>,
    ) -> Option<Decimal> {
        let value = match self.value(name, current) {
            Ok(value) => value,
            Err(fallback) => return fallback,
        };

        let parsed = match value {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        };
        let Some(number) = parsed else {
            self.reject(name, "A valid number is required.");
            return None;
        };

        let problems = decimal_problems(number, max_digits, places);
        if problems.is_empty() {
            Some(number)
        } else {
            for problem in problems {
                self.reject(name, problem);
            }
            None
        }
    }
}

fn decimal_problems(number: Decimal, max_digits: u32, places: u32) -> Vec<String> {
    let mut problems = Vec::new();
    if number.is_sign_negative() && !number.is_zero() {
        problems.push("Ensure this value is greater than or equal to 0.".to_string());
    }

    let normalized = number.normalize();
    let scale = normalized.scale();
    let significant = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let (digits, decimals) = if scale > significant {
        (scale, scale)
    } else {
        (significant, scale)
    };
    let whole = digits - decimals;

    if digits > max_digits {
        problems.push(format!(
            "Ensure that there are no more than {max_digits} digits in total."
        ));
    }
    if decimals > places {
        problems.push(format!(
            "Ensure that there are no more than {places} decimal places."
        ));
    }
    if whole > max_digits - places {
        problems.push(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - places
        ));
    }
    problems
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
