//! Finding the license file.
//!
//! Search order, first existing file wins:
//! 1. an explicit path given by the caller
//! 2. a path configured by the host application
//! 3. the `BYTELOCK_LICENSE` environment variable
//! 4. `license.lic` in the working directory
//! 5. `~/.bytelock/license.lic`

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{LicenseError, LicenseResult};

/// Environment variable naming the license file.
pub const LICENSE_ENV_VAR: &str = "BYTELOCK_LICENSE";

/// Default license file name.
pub const LICENSE_FILE_NAME: &str = "license.lic";

/// Per-user license directory under the home directory.
const USER_LICENSE_DIR: &str = ".bytelock";

/// Locates the license file.
#[derive(Debug, Clone)]
pub struct LicenseLocator {
    explicit: Option<PathBuf>,
    configured: Option<PathBuf>,
    env_var: String,
    working_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl Default for LicenseLocator {
    fn default() -> Self {
        Self {
            explicit: None,
            configured: None,
            env_var: LICENSE_ENV_VAR.to_string(),
            working_dir: PathBuf::from("."),
            home_dir: dirs::home_dir(),
        }
    }
}

impl LicenseLocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_explicit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_configured_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.configured = Some(path.into());
        self
    }

    /// Reads the license path from `name` instead of [`LICENSE_ENV_VAR`].
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_home_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.home_dir = dir;
        self
    }

    /// Every candidate path, in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(5);
        paths.extend(self.explicit.clone());
        paths.extend(self.configured.clone());
        if let Some(value) = env::var_os(&self.env_var).filter(|v| !v.is_empty()) {
            paths.push(PathBuf::from(value));
        }
        paths.push(self.working_dir.join(LICENSE_FILE_NAME));
        if let Some(home) = &self.home_dir {
            paths.push(home.join(USER_LICENSE_DIR).join(LICENSE_FILE_NAME));
        }
        paths
    }

    /// The first candidate that is an existing file.
    pub fn locate(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => debug!("Using license file {:?}", path),
            None => debug!("No license file found"),
        }
        found
    }

    /// Reads the located license document.
    pub fn read_document(&self) -> LicenseResult<String> {
        let path = self.locate().ok_or_else(|| LicenseError::NotFound {
            searched: self.candidates().len(),
        })?;
        Ok(std::fs::read_to_string(path)?)
    }
}
