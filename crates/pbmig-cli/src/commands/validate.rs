use pbmig_core::{validate, ChangeDescriptor, DiagnosticSeverity};

pub fn run_validate(change: &ChangeDescriptor, format: &str) -> Result<(String, usize), String> {
    let result = validate(change);
    let error_count = result.errors.len();
    let warning_count = result.warnings.len();

    if format == "json" {
        let diagnostics: Vec<_> = result.errors.iter().chain(result.warnings.iter()).collect();
        let output = serde_json::json!({
            "diagnostics": diagnostics,
            "summary": {
                "errors": error_count,
                "warnings": warning_count,
                "action": change.kind(),
                "collection": change.collection_name(),
            }
        });
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| format!("JSON serialization error: {e}"))?;
        return Ok((json, error_count));
    }

    // Human-readable format
    let mut lines: Vec<String> = Vec::new();

    for d in result.errors.iter().chain(result.warnings.iter()) {
        let severity = match d.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        };
        lines.push(format!("{}[{}]: {}", severity, d.code, d.message));
    }

    let error_word = if error_count == 1 { "error" } else { "errors" };
    let warning_word = if warning_count == 1 {
        "warning"
    } else {
        "warnings"
    };
    lines.push(format!(
        "{error_count} {error_word}, {warning_count} {warning_word} in {} of {}.",
        change.kind(),
        change.collection_name()
    ));

    Ok((lines.join("\n"), error_count))
}
