use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Suffix of the history file written next to a script.
pub const HISTORY_SUFFIX: &str = "bbopt.jsonl";

/// The stable identity of an experiment script.
///
/// Derived from the script's canonical path, so two scripts at different
/// paths never share history even if their contents are identical. The
/// script file itself does not need to exist; only its directory does.
///
/// # Examples
///
/// ```
/// use bbopt::storage::ScriptIdentity;
///
/// let dir = std::env::temp_dir();
/// let id = ScriptIdentity::new(dir.join("tune.rs")).unwrap();
/// assert_eq!(id.history_path().file_name().unwrap(), "tune.rs.bbopt.jsonl");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptIdentity {
    script: PathBuf,
}

impl ScriptIdentity {
    /// Resolves the canonical identity of `script`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Durability`] if the path has no file name or its
    /// directory cannot be resolved.
    pub fn new(script: impl AsRef<Path>) -> Result<Self> {
        let script = script.as_ref();
        let file_name = script
            .file_name()
            .ok_or_else(|| Error::Durability(format!("{} has no file name", script.display())))?;
        let parent = match script.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = parent.canonicalize().map_err(|e| {
            Error::Durability(format!("cannot resolve {}: {e}", parent.display()))
        })?;
        Ok(Self {
            script: dir.join(file_name),
        })
    }

    /// The canonical script path.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Where this script's history lives: `<dir>/<file name>.bbopt.jsonl`.
    ///
    /// The full file name is kept so that `tune.rs` and `tune.py` in one
    /// directory never share a history.
    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        let mut name = self
            .script
            .file_name()
            .map_or_else(|| "script".into(), ToOwned::to_owned);
        name.push(".");
        name.push(HISTORY_SUFFIX);
        self.script.with_file_name(name)
    }
}

impl core::fmt::Display for ScriptIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.script.display())
    }
}
