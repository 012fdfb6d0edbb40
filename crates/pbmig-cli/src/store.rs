use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use pbmig_core::{MigrationError, MigrationResult, RenderedScript};

/// Migration files in one directory. Names handed to [`read`](Self::read)
/// must stay inside that directory.
pub struct MigrationStore {
    dir: PathBuf,
    extension: String,
}

impl MigrationStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names of all migrations, oldest first. A missing directory has none.
    pub fn list(&self) -> MigrationResult<Vec<String>> {
        if !self.dir.is_dir() {
            log::debug!("migrations directory {} does not exist", self.dir.display());
            return Ok(Vec::new());
        }

        let pattern = self.dir.join(format!("*.{}", self.extension));
        let pattern_str = pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str).map_err(|e| {
            MigrationError::Io(io::Error::other(format!("Invalid glob pattern: {e}")))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| MigrationError::Io(e.into_error()))?;
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Content of migration `name`.
    pub fn read(&self, name: &str) -> MigrationResult<String> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(MigrationError::MigrationNotFound(name.to_string()));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Write `script` as a new file. An existing file with the same name is
    /// never replaced.
    pub fn write(&self, script: &RenderedScript) -> MigrationResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.resolve(script.file_name())?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    MigrationError::Io(io::Error::new(
                        e.kind(),
                        format!("Migration file already exists: {}", path.display()),
                    ))
                } else {
                    MigrationError::Io(e)
                }
            })?;
        file.write_all(script.content().as_bytes())?;

        log::info!("wrote {}", path.display());
        Ok(path)
    }

    fn resolve(&self, name: &str) -> MigrationResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(name)),
            _ => Err(MigrationError::InvalidMigrationName(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbmig_core::{
        ChangeDescriptor, ErrorKind, FixedClock, MigrationConfig, Renderer,
    };
    use pretty_assertions::assert_eq;

    fn script(at: i64, collection: &str) -> RenderedScript {
        Renderer::with_clock(MigrationConfig::default(), FixedClock::from_unix(at)).render(
            &ChangeDescriptor::Delete {
                collection: collection.into(),
            },
        )
    }

    #[test]
    fn write_then_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::new(dir.path().join("pb_migrations"), "js");
        store.write(&script(1_700_000_200, "b")).unwrap();
        store.write(&script(1_700_000_100, "a")).unwrap();
        fs::write(dir.path().join("pb_migrations/notes.txt"), "x").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["1700000100_delete_a.js", "1700000200_delete_b.js"]
        );
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::new(dir.path().join("absent"), "js");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::new(dir.path(), "js");
        let s = script(1_700_000_000, "posts");
        store.write(&s).unwrap();

        let err = store.write(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn read_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::new(dir.path(), "js");
        for name in ["../secret.js", "/etc/passwd", "a/b.js", "..", ""] {
            let err = store.read(name).unwrap_err();
            assert!(
                matches!(err, MigrationError::InvalidMigrationName(_)),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::new(dir.path(), "js");
        let err = store.read("1_nothing.js").unwrap_err();
        assert!(matches!(err, MigrationError::MigrationNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedReference);
    }
}
