//! Per-user table mapping schemes to the command lines that handle them.
//!
//! The table is a small JSON document beside the host's persisted state.
//! Writes replace the file atomically so a concurrent `open` never observes a
//! half-written table.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use hermes_config::create_private_dir;

use crate::errors::HelperError;

/// Registered command lines keyed by scheme.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AssociationTable {
    #[serde(default)]
    schemes: BTreeMap<String, Vec<String>>,
    /// Schemes whose activations log at debug level.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    debugging: BTreeSet<String>,
}

impl AssociationTable {
    /// Loads the table at `path`; a missing file yields an empty table.
    pub(crate) fn load(path: &Utf8Path) -> Result<Self, HelperError> {
        let contents = match fs::read_to_string(path.as_std_path()) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(HelperError::ReadAssociations {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents).map_err(|source| HelperError::ParseAssociations {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the table to `path`, creating the parent directory.
    pub(crate) fn save(&self, path: &Utf8Path) -> Result<(), HelperError> {
        let write_error = |source: io::Error| HelperError::WriteAssociations {
            path: path.to_path_buf(),
            source,
        };
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        create_private_dir(parent)?;

        let encoded = serde_json::to_vec_pretty(self).map_err(HelperError::EncodeAssociations)?;
        let mut file = NamedTempFile::new_in(parent.as_std_path()).map_err(write_error)?;
        file.write_all(&encoded).map_err(write_error)?;
        file.persist(path.as_std_path())
            .map_err(|error| write_error(error.error))?;
        Ok(())
    }

    /// Associates `scheme` with `command`. Returns the replaced command line.
    pub(crate) fn insert(
        &mut self,
        scheme: &str,
        command: Vec<String>,
        debugging: bool,
    ) -> Option<Vec<String>> {
        if debugging {
            self.debugging.insert(scheme.to_owned());
        } else {
            self.debugging.remove(scheme);
        }
        self.schemes.insert(scheme.to_owned(), command)
    }

    /// Forgets `scheme`. Returns whether it was registered.
    pub(crate) fn remove(&mut self, scheme: &str) -> bool {
        self.debugging.remove(scheme);
        self.schemes.remove(scheme).is_some()
    }

    /// Whether `scheme` was registered with debugging enabled.
    pub(crate) fn debugging(&self, scheme: &str) -> bool {
        self.debugging.contains(scheme)
    }

    /// Command line registered for `scheme`.
    pub(crate) fn command(&self, scheme: &str) -> Option<&[String]> {
        self.schemes.get(scheme).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn temp_table_path() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("conf/associations.json"))
            .expect("utf8 temp path");
        (dir, path)
    }

    #[test]
    fn missing_file_is_an_empty_table() {
        let (_dir, path) = temp_table_path();
        let table = AssociationTable::load(&path).expect("load should succeed");
        assert_eq!(table, AssociationTable::default());
    }

    #[test]
    fn saved_table_loads_back() {
        let (_dir, path) = temp_table_path();
        let mut table = AssociationTable::default();
        table.insert("hue4", vec!["/opt/host".to_owned(), "%1".to_owned()], false);
        table.save(&path).expect("save should succeed");

        let loaded = AssociationTable::load(&path).expect("load should succeed");
        assert_eq!(
            loaded.command("hue4"),
            Some(["/opt/host".to_owned(), "%1".to_owned()].as_slice())
        );
    }

    #[test]
    fn insert_replaces_and_remove_reports_presence() {
        let mut table = AssociationTable::default();
        assert!(table.insert("hue4", vec!["a".to_owned()], false).is_none());
        assert_eq!(
            table.insert("hue4", vec!["b".to_owned()], false),
            Some(vec!["a".to_owned()])
        );
        assert!(table.remove("hue4"));
        assert!(!table.remove("hue4"));
        assert!(table.command("hue4").is_none());
    }

    #[test]
    fn debugging_follows_the_latest_registration() {
        let (_dir, path) = temp_table_path();
        let mut table = AssociationTable::default();
        table.insert("hue4", vec!["a".to_owned()], true);
        table.save(&path).expect("save should succeed");
        let mut loaded = AssociationTable::load(&path).expect("load should succeed");
        assert!(loaded.debugging("hue4"));

        loaded.insert("hue4", vec!["a".to_owned()], false);
        assert!(!loaded.debugging("hue4"));
        loaded.insert("hue4", vec!["a".to_owned()], true);
        assert!(loaded.remove("hue4"));
        assert!(!loaded.debugging("hue4"));
    }

    #[test]
    fn tables_without_debugging_entries_still_load() {
        let (_dir, path) = temp_table_path();
        create_private_dir(path.parent().expect("parent")).expect("create dir");
        fs::write(path.as_std_path(), r#"{"schemes":{"hue4":["a"]}}"#).expect("write file");
        let table = AssociationTable::load(&path).expect("load should succeed");
        assert!(!table.debugging("hue4"));
        assert_eq!(table.command("hue4"), Some(["a".to_owned()].as_slice()));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let (_dir, path) = temp_table_path();
        create_private_dir(path.parent().expect("parent")).expect("create dir");
        fs::write(path.as_std_path(), "{not json").expect("write file");
        let error = AssociationTable::load(&path).expect_err("corrupt table should fail");
        assert!(matches!(error, HelperError::ParseAssociations { .. }));
    }
}
