//! Configuration check command.

use std::io::Write;
use std::path::Path;

use trustflow_hub::HubConfig;

use crate::error::CliError;
use crate::output::{ConfigView, OutputFormat};

/// Config check executor.
#[derive(Debug, Default)]
pub struct CheckConfigCommand;

impl CheckConfigCommand {
    /// Create a new config check command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Load and validate `path`, then print the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        path: &Path,
    ) -> Result<(), CliError> {
        let config = HubConfig::from_file(path)?;
        let view = ConfigView {
            path: path.display().to_string(),
            config,
        };
        format.write(writer, &view)
    }
}
