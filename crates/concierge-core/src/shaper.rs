//! Response shaping helpers for raw tool-provider payloads.

use serde_json::{json, Value};

/// Normalise a tool payload to JSON.
///
/// Providers answer with a JSON object, a JSON-encoded string, or a list of
/// typed content blocks where a `"text"` block carries the JSON. Anything
/// that cannot be parsed is wrapped as `{"raw": <value>}`.
pub fn unwrap_tool_json(result: &Value) -> Value {
    match result {
        Value::Object(_) => result.clone(),
        Value::String(text) => parse_or_raw(text),
        Value::Array(blocks) => {
            let text_block = blocks.iter().find_map(|block| {
                let obj = block.as_object()?;
                if obj.get("type").and_then(Value::as_str) != Some("text") {
                    return None;
                }
                obj.get("text")
            });
            match text_block {
                Some(Value::String(text)) => parse_or_raw(text),
                Some(other) => json!({ "raw": other }),
                None => json!({ "raw": result }),
            }
        }
        other => json!({ "raw": other }),
    }
}

fn parse_or_raw(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Flatten a tool payload into text for the model's tool-result message.
pub fn tool_output_text(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => {
            let texts: Vec<&str> = blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                result.to_string()
            } else {
                texts.join("\n")
            }
        }
        other => other.to_string(),
    }
}

/// Minor units (cents) to a display amount rounded to 2 decimals.
///
/// `money` is a `{amount, currency}` object; missing or null amounts give `None`.
pub fn money_to_decimal(money: Option<&Value>) -> Option<f64> {
    let amount = money?.get("amount")?.as_f64()?;
    Some(round2(amount / 100.0))
}

/// Currency of a money object, `USD` when absent.
pub fn money_currency(money: Option<&Value>) -> String {
    money
        .and_then(|m| m.get("currency"))
        .and_then(Value::as_str)
        .unwrap_or("USD")
        .to_string()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
