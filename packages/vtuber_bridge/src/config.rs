use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use vtuber_protocol::text::PipelineOptions;

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [reasoning]
//                    enabled = true
//
//   env var:         VTB_REASONING__ENABLED=true   (double underscore = nesting)
//
//   (single underscore stays within field names: VTB_REASONING__STRIP_EMOJI)

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileConfig {
    /// WebSocket endpoint of the VTuber backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub reasoning: ReasoningFileConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            reasoning: ReasoningFileConfig::default(),
        }
    }
}

/// Reasoning post-processing (lives under `[reasoning]` in config.toml).
///
/// `display_reasoning` and `strip_emoji` only take effect when `enabled` is set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReasoningFileConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub display_reasoning: bool,
    #[serde(default)]
    pub strip_emoji: bool,
}

fn default_endpoint() -> String {
    "ws://127.0.0.1:12393/client-ws".to_string()
}

/// Build a figment that layers: defaults → config.toml → VTB_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `VTB_ENDPOINT=ws://host:12393/client-ws`  →  `endpoint = ...`
///   `VTB_REASONING__ENABLED=true`  →  `reasoning.enabled = true`
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("VTB_").split("__"))
}

// =============================================================================
// Runtime config (derived from FileConfig)
// =============================================================================

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub endpoint: String,
    pub pipeline: PipelineOptions,
}

impl BridgeConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        let reasoning = fc.reasoning.enabled;
        Self {
            endpoint: fc.endpoint.clone(),
            pipeline: PipelineOptions {
                reasoning,
                display_reasoning: reasoning && fc.reasoning.display_reasoning,
                strip_emoji: reasoning && fc.reasoning.strip_emoji,
            },
        }
    }
}

// =============================================================================
// Directory layout (not tunable via figment, derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct BridgePaths {
    pub data_dir: PathBuf,
}

impl BridgePaths {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".vtuber-bridge"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Load the layered file config for this data directory.
    pub fn load(&self) -> Result<FileConfig> {
        load_config(&self.data_dir)
            .extract()
            .with_context(|| format!("Invalid configuration in {:?}", self.config_path()))
    }
}
