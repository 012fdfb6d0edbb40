use pbmig_core::{MigrationConfig, Renderer, RevertFidelity};

use crate::store::MigrationStore;

/// Synthesize and write a revert of migration `name`.
///
/// With `strict`, a revert that can only fail is reported as an error instead
/// of being written.
pub fn run_revert(
    name: &str,
    config: &MigrationConfig,
    store: &MigrationStore,
    strict: bool,
    dry_run: bool,
) -> Result<String, String> {
    let original = store.read(name).map_err(|e| e.to_string())?;
    let revert = Renderer::new(config.clone()).synthesize_revert(&original, name);

    if strict {
        revert.check().map_err(|e| e.to_string())?;
    }
    if dry_run {
        return Ok(revert.script.content().trim_end().to_string());
    }

    let path = store.write(&revert.script).map_err(|e| e.to_string())?;
    let note = match &revert.fidelity {
        RevertFidelity::Exact => String::new(),
        RevertFidelity::Degraded => {
            " (placeholder structure: original fields are not restored)".to_string()
        }
        RevertFidelity::Irrecoverable { reason } => format!(" (fails when applied: {reason})"),
    };
    Ok(format!("Created revert migration: {}{note}", path.display()))
}
