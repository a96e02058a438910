use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Mutable state shared by the runners of one flow run. Owned exclusively by
/// that run; never shared across concurrent executions.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    /// The trigger input payload, captured verbatim.
    pub input: Value,
    /// Trigger input fields plus per-node derived fields, accumulated as the
    /// run progresses.
    variables: Map<String, Value>,
    /// Full result object of every node that has executed so far, failed
    /// steps included.
    step_results: HashMap<String, Value>,
    /// Node ids in the order their steps were recorded.
    step_order: Vec<String>,
}

impl ExecutionContext {
    pub fn new(execution_id: String, input: Value) -> Self {
        // Non-object payloads stay addressable under a fixed key.
        let variables = match &input {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("payload".to_string(), other.clone());
                map
            }
        };

        Self {
            execution_id,
            input,
            variables,
            step_results: HashMap::new(),
            step_order: Vec::new(),
        }
    }

    /// Current working view of the lead data: input plus derived fields.
    pub fn current_data(&self) -> Value {
        Value::Object(self.variables.clone())
    }

    pub fn get_variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn set_variable(&mut self, key: String, value: Value) {
        self.variables.insert(key, value);
    }

    /// Merge an object of derived fields over the current variables.
    /// Non-object values are ignored.
    pub fn merge_variables(&mut self, value: &Value) {
        if let Value::Object(map) = value {
            for (k, v) in map {
                self.variables.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn record_step_result(&mut self, node_id: &str, result: Value) {
        if !self.step_results.contains_key(node_id) {
            self.step_order.push(node_id.to_string());
        }
        self.step_results.insert(node_id.to_string(), result);
    }

    pub fn step_result(&self, node_id: &str) -> Option<&Value> {
        self.step_results.get(node_id)
    }

    pub fn executed_count(&self) -> usize {
        self.step_order.len()
    }

    /// Read-only snapshot for monitor nodes: every prior step result keyed
    /// `step_<nodeId>`, plus the current variables.
    pub fn snapshot(&self) -> Value {
        let mut steps = Map::new();
        for node_id in &self.step_order {
            if let Some(result) = self.step_results.get(node_id) {
                steps.insert(format!("step_{node_id}"), result.clone());
            }
        }
        json!({
            "stepResults": Value::Object(steps),
            "variables": self.current_data(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_input_seeds_variables() {
        let ctx = ExecutionContext::new("exec_1".into(), json!({"leadName": "Acme", "score": 80}));
        assert_eq!(ctx.get_variable("leadName"), Some(&json!("Acme")));
        assert_eq!(ctx.current_data()["score"], json!(80));
    }

    #[test]
    fn scalar_input_wrapped_under_payload() {
        let ctx = ExecutionContext::new("exec_1".into(), json!([1, 2, 3]));
        assert_eq!(ctx.get_variable("payload"), Some(&json!([1, 2, 3])));
        assert_eq!(ctx.input, json!([1, 2, 3]));
    }

    #[test]
    fn snapshot_keys_prior_steps_only() {
        let mut ctx = ExecutionContext::new("exec_1".into(), json!({}));
        ctx.record_step_result("t1", json!({"success": true}));
        ctx.record_step_result("h1", json!({"success": false, "error": "boom"}));

        let snapshot = ctx.snapshot();
        let steps = snapshot["stepResults"].as_object().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps["step_t1"]["success"], json!(true));
        assert_eq!(steps["step_h1"]["success"], json!(false));
        assert!(!steps.contains_key("step_m1"));
    }

    #[test]
    fn merge_overwrites_existing_fields() {
        let mut ctx = ExecutionContext::new("exec_1".into(), json!({"tier": "cold"}));
        ctx.merge_variables(&json!({"tier": "hot", "priority": "high"}));
        assert_eq!(ctx.get_variable("tier"), Some(&json!("hot")));
        assert_eq!(ctx.get_variable("priority"), Some(&json!("high")));

        // Non-object merges are no-ops.
        ctx.merge_variables(&json!("ignored"));
        assert_eq!(ctx.current_data().as_object().unwrap().len(), 2);
    }
}
