use serde_json::Value;

/// One log line describing a consumed message, per queue.
pub fn summarize(queue: &str, message: &Value) -> String {
    let f = |key: &str| field(message, key);
    match queue {
        "orders" => format!(
            "[Order Service] Pedido {}: {} x {} para {}",
            f("order_id"),
            f("quantity"),
            f("item"),
            f("user")
        ),
        "alerts" => format!(
            "[Notification] {} bajo en stock ({} unidades restantes)",
            f("item"),
            f("stock_level")
        ),
        "billing" => format!(
            "[Billing Service] Procesando factura {} - Cliente: {} - Total: ${}",
            f("invoice_id"),
            f("customer"),
            f("total")
        ),
        "delivery" => format!(
            "[Delivery Service] Envío {} - {} - {} ({} min)",
            f("delivery_id"),
            f("customer"),
            f("status"),
            f("estimated_time_minutes")
        ),
        other => format!("[{other}] {message}"),
    }
}

// Strings unquoted, anything else as compact JSON.
fn field(message: &Value, key: &str) -> String {
    match message.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "?".to_string(),
    }
}
