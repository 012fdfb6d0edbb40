//! Revert Synthesizer: a new script that undoes an existing one, built from
//! the script text alone.
//!
//! Only creations and field additions can be undone exactly. A deletion is
//! answered with a placeholder collection under the same name. Everything else
//! replaced state that no script recorded, so the revert's apply step throws
//! instead of guessing. The inverse of a revert always throws: reverts do not
//! chain.

use chrono::{DateTime, Utc};

use crate::classifier::classify;
use crate::clock::Clock;
use crate::error::{MigrationError, MigrationResult};
use crate::naming;
use crate::renderer::{self, Renderer};
use crate::types::*;

const ROLLBACK_UNSUPPORTED: &str = "Rollback of revert migration not supported";
const REVERT_MARKER: &str = "PocketBase Migration - Revert:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertFidelity {
    /// Restores the exact prior schema.
    Exact,
    /// Restores something under the old name, not the old definition.
    Degraded,
    /// The revert script fails when applied.
    Irrecoverable { reason: String },
}

#[derive(Debug, Clone)]
pub struct Revert {
    pub script: RenderedScript,
    pub fidelity: RevertFidelity,
    pub classification: Classification,
}

impl Revert {
    /// `Err(IrrecoverableRevert)` when the synthesized script can only fail.
    pub fn check(&self) -> MigrationResult<()> {
        match &self.fidelity {
            RevertFidelity::Irrecoverable { reason } => Err(MigrationError::IrrecoverableRevert {
                kind: self.classification.kind,
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl<C: Clock> Renderer<C> {
    /// Build a script reverting `original`, named after `original_file_name`.
    pub fn synthesize_revert(&self, original: &str, original_file_name: &str) -> Revert {
        let generated_at = self.now();
        let file_name = naming::revert_file_name(
            generated_at.timestamp(),
            original_file_name,
            &self.config().extension,
        );
        let (content, fidelity, classification) =
            revert_content(original, original_file_name, generated_at);

        match &fidelity {
            RevertFidelity::Exact => log::debug!("exact revert of {original_file_name}"),
            RevertFidelity::Degraded => log::warn!(
                "revert of {original_file_name} recreates \"{}\" as a placeholder; its original fields are lost",
                classification.collection
            ),
            RevertFidelity::Irrecoverable { reason } => {
                log::warn!("revert of {original_file_name} cannot succeed: {reason}")
            }
        }

        Revert {
            script: RenderedScript::new(file_name, content),
            fidelity,
            classification,
        }
    }
}

/// Revert text for `original`, its fidelity, and the classification it was
/// derived from.
pub fn revert_content(
    original: &str,
    original_file_name: &str,
    generated_at: DateTime<Utc>,
) -> (String, RevertFidelity, Classification) {
    let classification = classify(original);
    let plan = if is_revert(original) {
        RevertPlan::irrecoverable(ROLLBACK_UNSUPPORTED.to_string())
    } else {
        plan(&classification)
    };
    let content = format!(
        "{}{}",
        renderer::header(
            &[
                format!("Revert: {original_file_name}"),
                plan.description.clone(),
            ],
            generated_at
        ),
        renderer::migrate(&plan.action, &renderer::throw(ROLLBACK_UNSUPPORTED))
    );
    (content, plan.fidelity, classification)
}

/// Scripts written by this module: marked in the header, and their inverse
/// step refuses to run.
fn is_revert(script: &str) -> bool {
    script.contains(REVERT_MARKER) || script.contains(ROLLBACK_UNSUPPORTED)
}

struct RevertPlan {
    description: String,
    action: String,
    fidelity: RevertFidelity,
}

impl RevertPlan {
    fn irrecoverable(message: String) -> Self {
        Self {
            description: message.clone(),
            action: renderer::throw(&message),
            fidelity: RevertFidelity::Irrecoverable { reason: message },
        }
    }
}

fn plan(c: &Classification) -> RevertPlan {
    if !c.is_resolved() {
        return RevertPlan::irrecoverable("Cannot revert unrecognized migration".to_string());
    }
    let name = c.collection.as_str();

    match c.kind {
        ChangeKind::Create => RevertPlan {
            description: format!("Revert creation of {name} collection"),
            action: format!(
                "  return $app.delete($app.findCollectionByNameOrId({}));",
                renderer::js_str(name)
            ),
            fidelity: RevertFidelity::Exact,
        },
        ChangeKind::Delete => RevertPlan {
            description: format!("Recreate {name} collection (placeholder structure)"),
            action: format!(
                "  // Original definition not stored, recreating a placeholder\n{}\n\n  return $app.save(collection);",
                renderer::collection_literal(&placeholder_collection(name))
            ),
            fidelity: RevertFidelity::Degraded,
        },
        ChangeKind::AddField => match &c.field {
            Some(field) => RevertPlan {
                description: format!("Remove field {field} from {name} collection"),
                action: format!(
                    "{}\n\n{}\n\n  return $app.save(collection);",
                    renderer::find_collection(name),
                    renderer::remove_field_line(field)
                ),
                fidelity: RevertFidelity::Exact,
            },
            None => RevertPlan::irrecoverable(
                "Cannot revert field addition - added field name not found".to_string(),
            ),
        },
        ChangeKind::RemoveField => RevertPlan::irrecoverable(format!(
            "Cannot restore removed field {} - original definition not stored",
            c.field.as_deref().unwrap_or("unknown")
        )),
        ChangeKind::UpdateFields => RevertPlan::irrecoverable(
            "Cannot revert field updates - original field definitions not stored".to_string(),
        ),
        ChangeKind::Update => RevertPlan::irrecoverable(
            "Cannot revert collection updates - original values not stored".to_string(),
        ),
    }
}

/// Stand-in for a deleted collection: one required text field, no rules.
pub fn placeholder_collection(name: &str) -> CollectionDescriptor {
    CollectionDescriptor::new(name, CollectionType::Base).with_field(
        FieldDescriptor::new(
            "name",
            FieldKind::Text {
                max_length: Some(100),
            },
        )
        .with_required(true),
    )
}
