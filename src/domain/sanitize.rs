use serde_json::Value;

/// Masks PII in a payload before it leaves the pipeline (dead-letter rows,
/// timeline responses). Works on a raw order object or on a full envelope,
/// where the order fields live under `data`.
pub fn sanitize_payload(payload: &Value) -> Value {
    let mut out = payload.clone();
    if let Some(obj) = out.as_object_mut() {
        sanitize_order_fields(obj);
        if let Some(Value::Object(data)) = obj.get_mut("data") {
            sanitize_order_fields(data);
        }
    }
    out
}

fn sanitize_order_fields(obj: &mut serde_json::Map<String, Value>) {
    if let Some(email) = obj.get("email").and_then(Value::as_str) {
        let masked = mask_email(email);
        obj.insert("email".to_string(), Value::String(masked));
    }

    if let Some(Value::Object(billing)) = obj.get_mut("billing") {
        for field in ["email", "phone", "address_1"] {
            if billing.contains_key(field) {
                billing.insert(field.to_string(), Value::String("***".to_string()));
            }
        }
        for field in ["first_name", "last_name"] {
            if let Some(name) = billing.get(field).and_then(Value::as_str) {
                let masked = match name.chars().next() {
                    Some(c) => format!("{c}***"),
                    None => "***".to_string(),
                };
                billing.insert(field.to_string(), Value::String(masked));
            }
        }
    }

    if obj.contains_key("transaction_id") {
        obj.insert("transaction_id".to_string(), Value::String("***".to_string()));
    }
}

/// Keeps the first two characters of the local part, masks the rest.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let kept: String = local.chars().take(2).collect();
            format!("{kept}***@{domain}")
        }
        None => "***".to_string(),
    }
}
