//! Model Output Parsing
//!
//! Vision models wrap their JSON in prose or markdown fences. The first
//! top-level object is pulled out of the text before decoding.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::ScannedReceipt;
use crate::domain::{DomainError, DomainResult};

fn fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").ok())
        .as_ref()
}

/// Balanced `{...}` opening at byte `start`; braces inside JSON strings are skipped
fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First balanced `{...}` that decodes as a JSON object. Stray braces in
/// prose are skipped; if nothing decodes, the first balanced span is returned
/// so the caller reports the decode error.
fn balanced_object(text: &str) -> Option<&str> {
    let mut first = None;
    for (start, _) in text.match_indices('{') {
        let Some(span) = balanced_from(text, start) else {
            continue;
        };
        if matches!(serde_json::from_str::<Value>(span), Ok(Value::Object(_))) {
            return Some(span);
        }
        first.get_or_insert(span);
    }
    first
}

/// The JSON object in a model response: a fenced block's object if there
/// is one, otherwise the first top-level object in the text
pub fn extract_json_object(text: &str) -> Option<&str> {
    let fenced = fence()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|body| balanced_object(body.as_str()));

    fenced.or_else(|| balanced_object(text))
}

/// Decode the model's answer. Failures carry the raw text for diagnostics.
pub fn parse_scan_response(text: &str) -> DomainResult<ScannedReceipt> {
    let Some(json) = extract_json_object(text) else {
        log::error!("No JSON object in scan response: {}", text);
        return Err(DomainError::scan_with_raw("No JSON found in response", text));
    };

    let value: Value = serde_json::from_str(json).map_err(|e| {
        log::error!("Unparseable scan response: {}", text);
        DomainError::scan_with_raw(format!("Failed to parse receipt data: {}", e), text)
    })?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(DomainError::scan(error));
    }

    serde_json::from_value(value)
        .map_err(|e| DomainError::scan_with_raw(format!("Unexpected receipt shape: {}", e), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let text = r#"{"items": [], "total_amount": 10.5}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_object_inside_prose() {
        let text = r#"Aqui está o resultado: {"market": "Extra"} Espero ter ajudado!"#;
        assert_eq!(extract_json_object(text), Some(r#"{"market": "Extra"}"#));
    }

    #[test]
    fn test_stray_braces_before_object_are_skipped() {
        let text = r#"Total {aprox} {"total_amount": 10}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"total_amount": 10}"#));

        let unclosed = r#"Nota { ilegível {"market": "Extra"}"#;
        assert_eq!(extract_json_object(unclosed), Some(r#"{"market": "Extra"}"#));
        assert_eq!(parse_scan_response(unclosed).unwrap().market.as_deref(), Some("Extra"));
    }

    #[test]
    fn test_fenced_block_wins() {
        let text = "Exemplo {a}\n```json\n{\"total_amount\": 42.9}\n```\n";
        assert_eq!(extract_json_object(text), Some("{\"total_amount\": 42.9}"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"market": "Loja {Centro}", "items": [{"name": "Sal \"}\" fino"}]} trailing"#;
        let json = extract_json_object(text).unwrap();
        assert!(json.ends_with("]}"));
        let value: Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["market"], "Loja {Centro}");
    }

    #[test]
    fn test_missing_object_keeps_raw_text() {
        let err = parse_scan_response("Não consegui ler a imagem.").unwrap_err();
        match err {
            DomainError::Scan { raw, .. } => assert_eq!(raw.as_deref(), Some("Não consegui ler a imagem.")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_object_is_error() {
        assert!(parse_scan_response(r#"{"items": [ {"name": "Arroz""#).is_err());
    }

    #[test]
    fn test_error_object_is_surfaced() {
        let err = parse_scan_response(r#"{"error": "Image data is required"}"#).unwrap_err();
        assert_eq!(err, DomainError::scan("Image data is required"));
    }

    #[test]
    fn test_null_fields_are_accepted() {
        let text = r#"```
{"items": null, "total_amount": null, "market": null, "payment_method": null, "purchase_date": null}
```"#;
        let scanned = parse_scan_response(text).unwrap();
        assert_eq!(scanned, ScannedReceipt::default());
    }

    #[test]
    fn test_full_receipt() {
        let text = r#"{
  "items": [
    {"name": "Arroz 5kg", "quantity": 1, "unit_price": 25.90, "total_price": 25.90},
    {"name": "Feijão 1kg", "quantity": 2, "unit_price": 8.50, "total_price": 17.00}
  ],
  "total_amount": 42.90,
  "market": "Supermercado Extra",
  "payment_method": "Débito",
  "purchase_date": "2024-01-15"
}"#;
        let scanned = parse_scan_response(text).unwrap();
        assert_eq!(scanned.item_count(), 2);
        assert_eq!(scanned.market.as_deref(), Some("Supermercado Extra"));
        assert_eq!(scanned.purchase_date.as_deref(), Some("2024-01-15"));
    }
}
