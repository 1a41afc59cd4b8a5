use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DATA_DIR_ENV_VAR: &str = "FOLIO_DATA_DIR";
pub const CATALOGUE_ENV_VAR: &str = "FOLIO_CATALOGUE";
pub const STORE_ENV_VAR: &str = "FOLIO_STORE";

/// File name of the portfolio catalogue inside `resources/`.
pub const CATALOGUE_FILE: &str = "my_portfolio.csv";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The FOLIO_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/folio/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("folio")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding installation resources such as the catalogue.
    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }

    /// Catalogue location: explicit path, then FOLIO_CATALOGUE, then
    /// `resources/my_portfolio.csv` under the data directory.
    pub fn catalogue_path(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(val) = std::env::var(CATALOGUE_ENV_VAR) {
            return PathBuf::from(val);
        }
        self.resources_dir().join(CATALOGUE_FILE)
    }

    /// Semantic store location: explicit path, then FOLIO_STORE, then
    /// `vectorstore/` under the data directory.
    ///
    /// The directory is not created here; opening the store does that, and
    /// a failure to do so is a backend failure rather than a config error.
    pub fn store_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(val) = std::env::var(STORE_ENV_VAR) {
            return PathBuf::from(val);
        }
        self.root.join("vectorstore")
    }
}
