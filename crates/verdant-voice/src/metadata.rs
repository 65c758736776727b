//! Decoding participant metadata into a diagnostic context.

use serde_json::Value;
use tracing::{debug, warn};
use verdant_types::{DiagnosisMetadata, DiagnosticContext};

/// Decodes raw participant metadata.
///
/// Absent or empty metadata and anything that is not a JSON object of the
/// expected shape yield `None`. A well-formed object with missing keys still
/// yields a context, with defaults filled in.
pub fn decode(raw: Option<&str>) -> Option<DiagnosticContext> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;

    let object = match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(
                kind = json_kind(&other),
                "ignoring participant metadata that is not an object"
            );
            return None;
        }
        Err(e) => {
            warn!("ignoring undecodable participant metadata: {}", e);
            return None;
        }
    };

    match serde_json::from_value::<DiagnosisMetadata>(object) {
        Ok(metadata) => {
            let ctx = metadata.into_context();
            debug!(
                class_name = %ctx.class_name,
                confidence = ctx.confidence,
                health = ?ctx.health,
                "decoded diagnostic context"
            );
            Some(ctx)
        }
        Err(e) => {
            warn!("participant metadata has unexpected field types: {}", e);
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_types::HealthStatus;

    #[test]
    fn absent_and_empty_metadata() {
        assert_eq!(decode(None), None);
        assert_eq!(decode(Some("")), None);
        assert_eq!(decode(Some("   ")), None);
    }

    #[test]
    fn malformed_metadata_is_absent() {
        assert_eq!(decode(Some("not json")), None);
        assert_eq!(decode(Some("{\"className\":")), None);
        assert_eq!(decode(Some("[1, 2, 3]")), None);
        assert_eq!(decode(Some("42")), None);
        assert_eq!(decode(Some("null")), None);
        assert_eq!(decode(Some("[]")), None);
        assert_eq!(decode(Some(r#"{"confidence":"high"}"#)), None);
    }

    #[test]
    fn full_metadata() {
        let ctx = decode(Some(
            r#"{"isHealthy":true,"confidence":0.87,"className":"Black Pod"}"#,
        ))
        .expect("context");
        assert_eq!(ctx.health, HealthStatus::Healthy);
        assert_eq!(ctx.confidence, 0.87);
        assert_eq!(ctx.class_name, "Black Pod");
    }

    #[test]
    fn missing_fields_are_defaulted() {
        let ctx = decode(Some("{}")).expect("context");
        assert_eq!(ctx.class_name, "");
        assert_eq!(ctx.confidence, 0.0);
        assert_eq!(ctx.health, HealthStatus::Unknown);

        let ctx = decode(Some(r#"{"isHealthy":false}"#)).expect("context");
        assert_eq!(ctx.health, HealthStatus::Diseased);
        assert_eq!(ctx.class_name, "");
    }

    #[test]
    fn null_health_flag_is_unknown() {
        let ctx = decode(Some(r#"{"className":"NULL","confidence":0.4,"isHealthy":null}"#))
            .expect("context");
        assert_eq!(ctx.health, HealthStatus::Unknown);
    }

    #[test]
    fn extra_client_fields_are_ignored() {
        let ctx = decode(Some(
            r#"{"className":"Mirid","confidence":72,"isHealthy":false,"tips":["a","b"],"imageUrl":"blob:x"}"#,
        ))
        .expect("context");
        assert_eq!(ctx.class_name, "Mirid");
        assert_eq!(ctx.confidence, 72.0);
    }
}
