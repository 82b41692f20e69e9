use crate::error::{BridgeError, Result};
use serde_json::Value;

/// Parse `text` as JSON, falling back to the outermost `{ ... }` slice when
/// the model wrapped the object in prose or code fences.
pub fn extract_json_object(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }

    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => return Err(BridgeError::Llm("No JSON object found in LLM output".to_string())),
    };

    serde_json::from_str(&text[start..=end])
        .map_err(|e| BridgeError::Llm(format!("Malformed JSON in LLM output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let value = extract_json_object(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(value["sql"], "SELECT 1");
    }

    #[test]
    fn test_fenced_object() {
        let text = "Here you go:\n```json\n{\"sql\": \"SELECT 1\", \"params\": []}\n```";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["sql"], "SELECT 1");
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json_object("SELECT 1").is_err());
        assert!(extract_json_object("} nope {").is_err());
        assert!(extract_json_object("{ not json }").is_err());
    }
}
