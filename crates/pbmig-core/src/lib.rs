pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod introspect;
pub mod naming;
pub mod renderer;
pub mod request;
pub mod revert;
pub mod types;
pub mod validator;

pub use classifier::classify;
pub use clock::{Clock, FixedClock, MonotonicClock, SystemClock};
pub use config::MigrationConfig;
pub use error::{ErrorKind, MigrationError, MigrationResult};
pub use introspect::{extract_collection, extract_collection_update, extract_fields};
pub use renderer::{render_content, Renderer};
pub use request::{from_script, CollectionRequest};
pub use revert::{placeholder_collection, revert_content, Revert, RevertFidelity};
pub use types::*;
pub use validator::validate;
