//! Per-queue message schemas.
//!
//! A schema is plain data: an ordered list of fields, each with a rule that
//! says whether it is required or what it defaults to. The order of `fields`
//! is the key order of the normalized payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How a single field is checked and filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// Must be present and truthy (not null, "", 0 or false).
    #[default]
    Required,
    /// Key must be present; any value, including null or zero, is accepted.
    Present,
    /// Takes `default` when absent or falsy.
    Optional,
    /// Takes the current time when absent or falsy.
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub rule: FieldRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    pub fn required(name: &str) -> Self {
        Self { name: name.to_string(), rule: FieldRule::Required, default: None }
    }

    pub fn present(name: &str) -> Self {
        Self { name: name.to_string(), rule: FieldRule::Present, default: None }
    }

    pub fn optional(name: &str, default: Value) -> Self {
        Self { name: name.to_string(), rule: FieldRule::Optional, default: Some(default) }
    }

    pub fn timestamp() -> Self {
        Self { name: "timestamp".to_string(), rule: FieldRule::Timestamp, default: None }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.rule, FieldRule::Required | FieldRule::Present)
    }
}

/// Schema for one queue of the configured set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl QueueSchema {
    pub fn new(name: &str, fields: Vec<FieldSpec>) -> Self {
        Self { name: name.to_string(), fields }
    }

    /// Names of the fields a producer must supply, in schema order.
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_required())
            .map(|f| f.name.as_str())
            .collect()
    }

    /// The four queues of the inventory/order demo.
    pub fn builtin() -> Vec<QueueSchema> {
        vec![
            QueueSchema::new(
                "orders",
                vec![
                    FieldSpec::required("order_id"),
                    FieldSpec::required("item"),
                    FieldSpec::required("quantity"),
                    FieldSpec::required("user"),
                    FieldSpec::timestamp(),
                ],
            ),
            QueueSchema::new(
                "alerts",
                vec![
                    FieldSpec::optional("type", json!("inventory_alert")),
                    FieldSpec::required("item"),
                    FieldSpec::present("stock_level"),
                    FieldSpec::optional("threshold", json!(5)),
                    FieldSpec::timestamp(),
                ],
            ),
            QueueSchema::new(
                "billing",
                vec![
                    FieldSpec::required("invoice_id"),
                    FieldSpec::required("customer"),
                    FieldSpec::required("item"),
                    FieldSpec::optional("quantity", json!(1)),
                    FieldSpec::optional("unit_price", json!(0)),
                    FieldSpec::required("total"),
                    FieldSpec::optional("status", json!("pending")),
                    FieldSpec::timestamp(),
                ],
            ),
            QueueSchema::new(
                "delivery",
                vec![
                    FieldSpec::required("delivery_id"),
                    FieldSpec::optional("order_id", json!("N/A")),
                    FieldSpec::required("customer"),
                    FieldSpec::required("address"),
                    FieldSpec::optional("status", json!("pending")),
                    FieldSpec::optional("estimated_time_minutes", json!(30)),
                    FieldSpec::timestamp(),
                ],
            ),
        ]
    }
}

/// Name of the shadow queue the relay consumes for `queue`.
pub fn monitor_queue(queue: &str) -> String {
    format!("{queue}{}", crate::config::MONITOR_SUFFIX)
}
