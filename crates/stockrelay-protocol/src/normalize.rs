//! Ingress validation and payload normalization.
//!
//! Presence follows JavaScript truthiness, which is what the dashboards and
//! existing producers were written against: `null`, `""`, `0` and
//! `false` count as missing for required fields and trigger the default for
//! optional ones. `FieldRule::Present` is the exception and only rejects
//! an absent key; an explicit `null` passes through.

use serde_json::{Map, Value};
use stockrelay_core::{types::now_rfc3339, FieldRule, QueueSchema};
use thiserror::Error;

use crate::frames::{ErrorBody, SubmitRequest};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Queue and message are required")]
    MissingQueueOrMessage,

    #[error("Message must be a JSON object")]
    NotAnObject,

    #[error("Invalid queue")]
    UnknownQueue { queue: String },

    #[error("{queue} message must include {}", join_fields(.required))]
    MissingFields {
        queue: String,
        required: Vec<String>,
        missing: Vec<String>,
    },
}

impl From<&ValidationError> for ErrorBody {
    fn from(err: &ValidationError) -> Self {
        let mut body = ErrorBody::new(err.to_string());
        match err {
            ValidationError::UnknownQueue { queue } => {
                body.details = Some(format!("{queue} is not a configured queue"));
            }
            ValidationError::MissingFields { required, missing, .. } => {
                body.required = Some(required.clone());
                body.missing = Some(missing.clone());
            }
            _ => {}
        }
        body
    }
}

/// Check the request envelope and resolve the target queue's schema.
///
/// Field-level checks are left to [`normalize`] so callers can interpose
/// their own checks (broker availability) in between.
pub fn resolve<'a>(
    queues: &'a [QueueSchema],
    req: &'a SubmitRequest,
) -> Result<(&'a QueueSchema, &'a Map<String, Value>), ValidationError> {
    let (Some(queue), Some(message)) = (req.queue.as_deref(), req.message.as_ref()) else {
        return Err(ValidationError::MissingQueueOrMessage);
    };
    if queue.is_empty() || message.is_null() {
        return Err(ValidationError::MissingQueueOrMessage);
    }

    let schema = queues
        .iter()
        .find(|s| s.name == queue)
        .ok_or_else(|| ValidationError::UnknownQueue { queue: queue.to_string() })?;

    let object = message.as_object().ok_or(ValidationError::NotAnObject)?;
    Ok((schema, object))
}

/// Validate `message` against `schema` and build the normalized payload.
pub fn normalize(
    schema: &QueueSchema,
    message: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    normalize_at(schema, message, &now_rfc3339())
}

/// [`normalize`] with an explicit value for defaulted timestamps.
pub fn normalize_at(
    schema: &QueueSchema,
    message: &Map<String, Value>,
    now: &str,
) -> Result<Map<String, Value>, ValidationError> {
    let missing: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| match f.rule {
            FieldRule::Required => !message.get(&f.name).is_some_and(is_truthy),
            FieldRule::Present => !message.contains_key(&f.name),
            FieldRule::Optional | FieldRule::Timestamp => false,
        })
        .map(|f| f.name.clone())
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields {
            queue: schema.name.clone(),
            required: schema.required_fields().into_iter().map(String::from).collect(),
            missing,
        });
    }

    let mut out = Map::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let given = message.get(&field.name).filter(|v| is_truthy(v));
        let value = match field.rule {
            FieldRule::Required | FieldRule::Present => message.get(&field.name).cloned(),
            FieldRule::Optional => given.cloned().or_else(|| field.default.clone()),
            FieldRule::Timestamp => given
                .cloned()
                .or_else(|| Some(Value::String(now.to_string()))),
        };
        if let Some(value) = value {
            out.insert(field.name.clone(), value);
        }
    }
    Ok(out)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn join_fields(fields: &[String]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: &str = "2026-01-01T00:00:00.000Z";

    fn schema(name: &str) -> QueueSchema {
        QueueSchema::builtin()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn orders_normalized_in_schema_order() {
        let msg = obj(json!({"order_id": "ORD-1", "item": "Latte", "user": "Ana", "quantity": 2}));
        let out = normalize_at(&schema("orders"), &msg, NOW).unwrap();

        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["order_id", "item", "quantity", "user", "timestamp"]);
        assert_eq!(
            Value::Object(out),
            json!({
                "order_id": "ORD-1", "item": "Latte", "quantity": 2,
                "user": "Ana", "timestamp": NOW
            })
        );
    }

    #[test]
    fn caller_timestamp_is_kept() {
        let msg = obj(json!({
            "order_id": "O", "item": "I", "user": "U", "quantity": 1, "timestamp": "yesterday"
        }));
        let out = normalize_at(&schema("orders"), &msg, NOW).unwrap();
        assert_eq!(out["timestamp"], "yesterday");
    }

    #[test]
    fn alerts_defaults() {
        let msg = obj(json!({"item": "Milk", "stock_level": 2}));
        let out = normalize_at(&schema("alerts"), &msg, NOW).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({
                "type": "inventory_alert", "item": "Milk", "stock_level": 2,
                "threshold": 5, "timestamp": NOW
            })
        );
    }

    #[test]
    fn alerts_accept_zero_stock() {
        let msg = obj(json!({"item": "Milk", "stock_level": 0}));
        let out = normalize_at(&schema("alerts"), &msg, NOW).unwrap();
        assert_eq!(out["stock_level"], 0);
    }

    #[test]
    fn alerts_pass_null_stock_level_through() {
        let msg = obj(json!({"item": "Milk", "stock_level": null}));
        let out = normalize_at(&schema("alerts"), &msg, NOW).unwrap();
        assert!(out.contains_key("stock_level"));
        assert!(out["stock_level"].is_null());
    }

    #[test]
    fn alerts_missing_stock_level() {
        let msg = obj(json!({"item": "Milk"}));
        let err = normalize_at(&schema("alerts"), &msg, NOW).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields {
                queue: "alerts".into(),
                required: vec!["item".into(), "stock_level".into()],
                missing: vec!["stock_level".into()],
            }
        );
        assert_eq!(err.to_string(), "alerts message must include item and stock_level");
    }

    #[test]
    fn billing_defaults() {
        let msg =
            obj(json!({"invoice_id": "F-1", "customer": "Ana", "item": "Latte", "total": 9.5}));
        let out = normalize_at(&schema("billing"), &msg, NOW).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({
                "invoice_id": "F-1", "customer": "Ana", "item": "Latte",
                "quantity": 1, "unit_price": 0, "total": 9.5,
                "status": "pending", "timestamp": NOW
            })
        );
    }

    #[test]
    fn delivery_defaults() {
        let msg = obj(json!({"delivery_id": "D-1", "customer": "Ana", "address": "Calle 1"}));
        let out = normalize_at(&schema("delivery"), &msg, NOW).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({
                "delivery_id": "D-1", "order_id": "N/A", "customer": "Ana",
                "address": "Calle 1", "status": "pending",
                "estimated_time_minutes": 30, "timestamp": NOW
            })
        );
    }

    #[test]
    fn falsy_optional_takes_default() {
        let msg = obj(json!({
            "invoice_id": "F-1", "customer": "Ana", "item": "X", "total": 3,
            "quantity": 0, "status": ""
        }));
        let out = normalize_at(&schema("billing"), &msg, NOW).unwrap();
        assert_eq!(out["quantity"], 1);
        assert_eq!(out["status"], "pending");
    }

    #[test]
    fn zero_quantity_order_is_rejected() {
        let msg = obj(json!({"order_id": "O", "item": "I", "user": "U", "quantity": 0}));
        let err = normalize_at(&schema("orders"), &msg, NOW).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingFields { ref missing, .. } if missing == &["quantity"]
        ));
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let msg = obj(json!({
            "order_id": "O", "item": "I", "user": "U", "quantity": 1, "coupon": "FREE"
        }));
        let out = normalize_at(&schema("orders"), &msg, NOW).unwrap();
        assert!(!out.contains_key("coupon"));
    }

    #[test]
    fn resolve_rejects_missing_parts() {
        let queues = QueueSchema::builtin();
        let req = SubmitRequest { queue: Some("orders".into()), message: None };
        assert_eq!(resolve(&queues, &req).unwrap_err(), ValidationError::MissingQueueOrMessage);

        let req = SubmitRequest { queue: None, message: Some(json!({})) };
        assert_eq!(resolve(&queues, &req).unwrap_err(), ValidationError::MissingQueueOrMessage);
    }

    #[test]
    fn resolve_rejects_unknown_queue() {
        let queues = QueueSchema::builtin();
        let req = SubmitRequest { queue: Some("payroll".into()), message: Some(json!({})) };
        assert_eq!(
            resolve(&queues, &req).unwrap_err(),
            ValidationError::UnknownQueue { queue: "payroll".into() }
        );
    }

    #[test]
    fn unknown_queue_body_keeps_name_in_details() {
        let body = ErrorBody::from(&ValidationError::UnknownQueue { queue: "payroll".into() });
        assert_eq!(body.error, "Invalid queue");
        assert_eq!(body.details.as_deref(), Some("payroll is not a configured queue"));
    }

    #[test]
    fn resolve_rejects_non_object_message() {
        let queues = QueueSchema::builtin();
        let req = SubmitRequest { queue: Some("orders".into()), message: Some(json!("ORD-1")) };
        assert_eq!(resolve(&queues, &req).unwrap_err(), ValidationError::NotAnObject);
    }

    #[test]
    fn error_body_enumerates_fields() {
        let err = ValidationError::MissingFields {
            queue: "orders".into(),
            required: vec!["order_id".into(), "item".into()],
            missing: vec!["item".into()],
        };
        let body = ErrorBody::from(&err);
        assert_eq!(body.error, "orders message must include order_id and item");
        assert_eq!(body.missing.unwrap(), ["item"]);
    }

    #[test]
    fn join_fields_formats() {
        let f = |v: &[&str]| join_fields(&v.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(f(&["a"]), "a");
        assert_eq!(f(&["a", "b", "c"]), "a, b and c");
    }
}
