//! Interpreter configuration.
//!
//! Every field has a default, so an empty YAML/JSON document is a valid config.
//! `validate` runs once when a session is constructed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::anchors::AnchorPolicy;
use crate::bandwidth::{Capacities, CostTable};
use crate::error::SessionInitError;
use crate::syntax::{Level, PersonaRef, SAFE_CONTAINMENT};

/// The only digest algorithm the audit chain supports.
pub const SHA256: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Persona allow-set.
    pub personas: Vec<PersonaRef>,
    /// Persona used by dispatches when neither the statement nor the session names one.
    pub default_persona: PersonaRef,
    /// Handle substituted for every persona while containment is active.
    pub containment_handle: String,
    pub bandwidth: BandwidthConfig,
    /// Intent tag → required anchors.
    pub policy: AnchorPolicy,
    pub audit: AuditConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            personas: ["@healer", "@sage", "@mirror", "@companion"]
                .into_iter()
                .map(PersonaRef::from_static)
                .collect(),
            default_persona: PersonaRef::from_static("@companion"),
            containment_handle: SAFE_CONTAINMENT.to_string(),
            bandwidth: BandwidthConfig::default(),
            policy: AnchorPolicy::default(),
            audit: AuditConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandwidthConfig {
    pub capacities: Capacities,
    pub initial_level: Level,
    pub costs: CostTable,
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            capacities: Capacities::default(),
            initial_level: Level::Medium,
            costs: CostTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub digest: String,
    /// JSON-lines file the chain is persisted to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { digest: SHA256.to_string(), log_path: None }
    }
}

impl InterpreterConfig {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read interpreter config {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&body)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            _ => serde_json::from_str(&body)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
        };
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionInitError> {
        if !self.audit.digest.eq_ignore_ascii_case(SHA256) {
            return Err(SessionInitError::UnsupportedDigest(self.audit.digest.clone()));
        }
        if self.personas.is_empty() {
            return Err(invalid("persona allow-set is empty"));
        }
        if !self.personas.contains(&self.default_persona) {
            return Err(invalid(format!(
                "default persona {} is not in the allow-set",
                self.default_persona
            )));
        }
        if self.containment_handle.trim().is_empty() {
            return Err(invalid("containment handle is empty"));
        }
        let caps = &self.bandwidth.capacities;
        if !caps.is_monotonic() {
            return Err(invalid(format!(
                "bandwidth capacities must increase strictly (low {} < medium {} < high {})",
                caps.low, caps.medium, caps.high
            )));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SessionInitError {
    SessionInitError::InvalidConfig(message.into())
}
