//! Hub configuration.
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use trustflow_core::amount::ATTO_PER_TOKEN;
use trustflow_core::{Amount, AvatarId, Timestamp};

use crate::error::{HubError, Result};

/// Largest vertex count a 16-bit coordinate can address.
pub const MAX_ADDRESSABLE_VERTICES: usize = u16::MAX as usize;

/// Limits applied by the default naming service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NameRules {
    /// Maximum group or organization name length.
    pub max_name_length: usize,
    /// Maximum group symbol length.
    pub max_symbol_length: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            max_name_length: 32,
            max_symbol_length: 16,
        }
    }
}

/// Configuration of a [`crate::Hub`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HubConfig {
    /// Treasury used by [`crate::Hub::register_group`].
    pub standard_treasury: Option<AvatarId>,
    /// Amount of the inviter's own asset burned per invitation.
    pub invitation_cost: Amount,
    /// Humans may register without an inviter until this time.
    ///
    /// `None` keeps registration open indefinitely.
    pub bootstrap_until: Option<Timestamp>,
    /// Maximum number of flow vertices per settlement.
    pub max_flow_vertices: usize,
    /// Naming limits for group and organization registration.
    pub names: NameRules,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            standard_treasury: None,
            invitation_cost: Amount::from_atto(96 * ATTO_PER_TOKEN),
            bootstrap_until: None,
            max_flow_vertices: MAX_ADDRESSABLE_VERTICES,
            names: NameRules::default(),
        }
    }
}

impl HubConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HubError::config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HubError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.max_flow_vertices == 0 {
            return Err(HubError::config("max_flow_vertices must be greater than 0"));
        }
        if self.max_flow_vertices > MAX_ADDRESSABLE_VERTICES {
            return Err(HubError::config(format!(
                "max_flow_vertices cannot exceed {MAX_ADDRESSABLE_VERTICES}"
            )));
        }
        if let Some(treasury) = self.standard_treasury {
            if treasury.is_reserved() {
                return Err(HubError::config(format!(
                    "standard_treasury {treasury} is a reserved id"
                )));
            }
        }
        if self.names.max_name_length == 0 || self.names.max_symbol_length == 0 {
            return Err(HubError::config("name limits must be greater than 0"));
        }
        Ok(())
    }

    /// Whether humans can still register without an inviter at `now`.
    #[must_use]
    pub fn bootstrap_open(&self, now: Timestamp) -> bool {
        self.bootstrap_until.is_none_or(|until| now <= until)
    }
}
