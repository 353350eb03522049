use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::wizard::WorkflowDefinition;

const CONFIG_FILE_STEM: &str = "compliance-wizard";
const RC_FILE: &str = ".compliance-wizard-rc";
const ENV_PREFIX: &str = "COMPLIANCE_WIZARD";

/// Main configuration structure for the compliance wizard
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Verification backend connection
    pub backend: BackendConfig,
    /// Notification display settings
    pub notifications: NotificationConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Workflow behaviour
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the verification API
    pub base_url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Sustained outbound request rate
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst: u32,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 120, // analysis of large PDFs is slow
            requests_per_second: 5,
            burst: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Seconds before a notification expires
    pub ttl_seconds: u64,
    /// Maximum notifications kept at once
    pub max_visible: usize,
}

impl NotificationConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 8,
            max_visible: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Move to the checklist step as soon as the ambiguity session completes
    pub auto_advance_after_resolution: bool,
    /// Custom step definition; the built-in seven steps are used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<WorkflowDefinition>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            auto_advance_after_resolution: true,
            definition: None,
        }
    }
}

impl WorkflowConfig {
    pub fn definition_or_default(&self) -> WorkflowDefinition {
        self.definition.clone().unwrap_or_default()
    }
}

impl WizardConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (compliance-wizard.toml, .compliance-wizard-rc)
    /// 3. Environment variables (prefixed with COMPLIANCE_WIZARD_, sections split by `__`)
    pub fn load() -> Result<Self> {
        Self::load_from_dir(Path::new("."))
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let main_file = dir.join(format!("{CONFIG_FILE_STEM}.toml"));
        if main_file.exists() {
            builder = builder.add_source(File::from(main_file));
        }

        let rc_file = dir.join(RC_FILE);
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let wizard_config: WizardConfig = config.try_deserialize()?;
        wizard_config.validate()?;
        Ok(wizard_config)
    }

    fn validate(&self) -> Result<()> {
        if self.backend.requests_per_second == 0 || self.backend.burst == 0 {
            anyhow::bail!("backend rate limit and burst must be greater than zero");
        }
        if let Some(definition) = &self.workflow.definition {
            definition.validate()?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
