//! Persistence for the proxy daemon's unit file.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::unit::{ProxyConfig, parse_unit, render_unit};
use crate::{Error, Result};

/// Sole reader/writer of the daemon's unit file.
///
/// The config is read fresh at the start of every mutating operation and
/// never cached across operations; writes replace the whole file
/// atomically via a sibling temp file and rename.
#[derive(Debug, Clone)]
pub struct ServiceStore {
    path: PathBuf,
}

impl ServiceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the current unit file.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigUnreadable`] when the file or its launch-command
    /// line is missing; [`Error::Io`] for other read failures.
    pub fn load(&self) -> Result<ProxyConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigUnreadable
            } else {
                Error::Io(e)
            }
        })?;
        parse_unit(&content)
    }

    /// Render and persist the full unit file as one atomic replace.
    ///
    /// # Errors
    ///
    /// [`Error::WriteFailed`] when the temp write or rename fails; the
    /// previous file is left intact in that case.
    pub fn save(&self, config: &ProxyConfig) -> Result<()> {
        let rendered = render_unit(config);

        // Sibling temp file so the rename stays on one filesystem.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, rendered).map_err(Error::WriteFailed)?;
        std::fs::rename(&tmp, &self.path).map_err(Error::WriteFailed)?;

        debug!(
            "Saved service unit with {} secrets to {}",
            config.secrets.len(),
            self.path.display()
        );
        Ok(())
    }
}
