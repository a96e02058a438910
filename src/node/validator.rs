use super::{StepFailure, timestamp};
use crate::engine::context::ExecutionContext;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Validation and routing rules for a lead record.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Fields that must be present and non-empty for the lead to qualify.
    pub required_fields: Vec<String>,
    pub email_field: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            required_fields: vec!["leadName".to_string()],
            email_field: "email".to_string(),
        }
    }
}

/// Routing outcomes, most to least favorable: `qualified`, `review`,
/// `rejected`.
const ROUTE_QUALIFIED: &str = "qualified";
const ROUTE_REVIEW: &str = "review";
const ROUTE_REJECTED: &str = "rejected";

/// Classifies and normalizes the current lead record, selecting a downstream
/// routing outcome. Normalized fields are written back so later nodes see
/// the cleaned-up lead.
pub fn run(config: &ValidatorConfig, ctx: &mut ExecutionContext) -> Result<Value, StepFailure> {
    let data = ctx.current_data();
    let Value::Object(fields) = data else {
        return Err(StepFailure::Runtime(
            "Lead data is not an object".to_string(),
        ));
    };

    let mut normalized = Map::new();
    for (key, value) in &fields {
        let cleaned = match value {
            Value::String(s) if *key == config.email_field => {
                Value::String(s.trim().to_lowercase())
            }
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        };
        normalized.insert(key.clone(), cleaned);
    }

    let mut missing: Vec<String> = Vec::new();
    for field in &config.required_fields {
        let present = matches!(
            normalized.get(field),
            Some(Value::String(s)) if !s.is_empty()
        ) || matches!(normalized.get(field), Some(v) if !v.is_null() && !v.is_string());
        if !present {
            missing.push(field.clone());
        }
    }

    let email = normalized
        .get(&config.email_field)
        .and_then(|v| v.as_str());
    let route = if !missing.is_empty() {
        ROUTE_REJECTED
    } else if email.is_some_and(|e| !is_plausible_email(e)) {
        ROUTE_REVIEW
    } else {
        ROUTE_QUALIFIED
    };

    let lead = Value::Object(normalized);
    ctx.merge_variables(&lead);

    Ok(json!({
        "success": true,
        "valid": missing.is_empty(),
        "route": route,
        "missingFields": missing,
        "lead": lead,
        "timestamp": timestamp(),
    }))
}

fn is_plausible_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_on(input: Value) -> (Value, ExecutionContext) {
        let mut ctx = ExecutionContext::new("exec_1".into(), input);
        let result = run(&ValidatorConfig::default(), &mut ctx).unwrap();
        (result, ctx)
    }

    #[test]
    fn complete_lead_qualifies() {
        let (result, _) = run_on(json!({"leadName": "Acme", "email": "sales@acme.io"}));
        assert_eq!(result["valid"], json!(true));
        assert_eq!(result["route"], json!("qualified"));
    }

    #[test]
    fn missing_required_field_rejects() {
        let (result, _) = run_on(json!({"email": "sales@acme.io"}));
        assert_eq!(result["valid"], json!(false));
        assert_eq!(result["route"], json!("rejected"));
        assert_eq!(result["missingFields"], json!(["leadName"]));
    }

    #[test]
    fn implausible_email_routes_to_review() {
        let (result, _) = run_on(json!({"leadName": "Acme", "email": "not-an-email"}));
        assert_eq!(result["valid"], json!(true));
        assert_eq!(result["route"], json!("review"));
    }

    #[test]
    fn lead_without_email_still_qualifies() {
        let (result, _) = run_on(json!({"leadName": "Acme"}));
        assert_eq!(result["route"], json!("qualified"));
    }

    #[test]
    fn normalizes_and_writes_back() {
        let (result, ctx) = run_on(json!({"leadName": "  Acme  ", "email": " Sales@ACME.io "}));
        assert_eq!(result["lead"]["leadName"], json!("Acme"));
        assert_eq!(result["lead"]["email"], json!("sales@acme.io"));
        assert_eq!(ctx.get_variable("email"), Some(&json!("sales@acme.io")));
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let (result, _) = run_on(json!({"leadName": "   "}));
        assert_eq!(result["route"], json!("rejected"));
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@.co"));
        assert!(!is_plausible_email("plain"));
    }
}
