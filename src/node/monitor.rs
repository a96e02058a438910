use super::timestamp;
use crate::engine::context::ExecutionContext;
use serde_json::{Value, json};

/// Diagnostic runner: captures a read-only snapshot of everything the run has
/// produced so far. Runs after all non-monitor nodes and never alters prior
/// results or control flow.
pub fn run(ctx: &ExecutionContext) -> Value {
    let snapshot = ctx.snapshot();

    let mut failed_steps = 0usize;
    let mut report = Vec::new();
    if let Some(steps) = snapshot["stepResults"].as_object() {
        for (key, result) in steps {
            let ok = result["success"].as_bool().unwrap_or(false);
            if !ok {
                failed_steps += 1;
            }
            report.push(format!("{key}: {}", if ok { "ok" } else { "failed" }));
        }
    }

    json!({
        "success": true,
        "dataSnapshot": snapshot,
        "executedNodes": ctx.executed_count(),
        "failedSteps": failed_steps,
        "report": report,
        "timestamp": timestamp(),
    })
}
