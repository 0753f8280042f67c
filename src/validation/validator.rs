//! # Field Validator
//!
//! Checks a create-request body against its model schema and reports every
//! violation at once. Field order in the report follows the schema; keys the
//! schema does not declare are reported afterwards, in body order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::core::error::{FieldError, GatewayError, GatewayResult};
use crate::validation::schema::{FieldKind, FieldRule, Model};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email pattern is valid")
});

/// Validate a record for the named model.
///
/// Fails with `UnknownModel` when the name has no schema and with
/// `ValidationFailed` carrying every violation otherwise.
pub fn validate_record(model: &str, body: &Value) -> GatewayResult<Model> {
    let model: Model = model.parse()?;
    let errors = collect_violations(model.schema(), body);

    if errors.is_empty() {
        Ok(model)
    } else {
        tracing::debug!(model = %model, violations = errors.len(), "Record rejected");
        Err(GatewayError::ValidationFailed { errors })
    }
}

/// Collect all violations of `schema` in `body`
pub fn collect_violations(schema: &[FieldRule], body: &Value) -> Vec<FieldError> {
    let Some(object) = body.as_object() else {
        return vec![FieldError::new("value", "value must be of type object")];
    };

    let mut errors = Vec::new();
    for rule in schema {
        check_field(rule, object, &mut errors);
    }

    for key in object.keys() {
        if !schema.iter().any(|rule| rule.name == key) {
            errors.push(FieldError::new(key.as_str(), format!("{} is not allowed", key)));
        }
    }

    errors
}

fn check_field(rule: &FieldRule, object: &Map<String, Value>, errors: &mut Vec<FieldError>) {
    let Some(value) = object.get(rule.name) else {
        if rule.required {
            errors.push(FieldError::new(rule.name, format!("{} is required", rule.label)));
        }
        return;
    };

    match rule.kind {
        FieldKind::String | FieldKind::Email => check_string(rule, value, errors),
        FieldKind::StringArray => check_string_array(rule, value, errors),
    }
}

fn check_string(rule: &FieldRule, value: &Value, errors: &mut Vec<FieldError>) {
    let Some(text) = value.as_str() else {
        // Email rules only override the format message, so the type error names the key.
        let subject = match rule.kind {
            FieldKind::Email => rule.name,
            _ => rule.label,
        };
        errors.push(FieldError::new(rule.name, format!("{} must be a string", subject)));
        return;
    };

    if text.is_empty() {
        errors.push(FieldError::new(rule.name, format!("{} cannot be empty", rule.label)));
    } else if rule.kind == FieldKind::Email && !EMAIL.is_match(text) {
        errors.push(FieldError::new(
            rule.name,
            format!("{} must be a valid email address", rule.label),
        ));
    }
}

fn check_string_array(rule: &FieldRule, value: &Value, errors: &mut Vec<FieldError>) {
    let Some(items) = value.as_array() else {
        errors.push(FieldError::new(rule.name, format!("{} must be an array", rule.label)));
        return;
    };

    for (index, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", rule.name, index);
        match item.as_str() {
            None => errors.push(FieldError::new(path.as_str(), format!("{} must be a string", path))),
            Some("") => errors.push(FieldError::new(
                path.as_str(),
                format!("{} is not allowed to be empty", path),
            )),
            Some(_) => {}
        }
    }
}
