use anyhow::Context;
use labelcheck_ocr::OcrInput;
use labelcheck_storage::LogStoreKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "labelcheck.toml";

/// Which OCR backend runs the recognition attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// The `tesseract` executable
    #[default]
    Cli,
    /// libtesseract linked in-process (requires the `tesseract` feature)
    Library,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    pub tesseract_path: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    /// `source` or a preprocessing technique name.
    pub input: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Cli,
            tesseract_path: PathBuf::from("tesseract"),
            tessdata_dir: None,
            language: "eng".to_string(),
            input: "source".to_string(),
        }
    }
}

impl OcrConfig {
    pub fn ocr_input(&self) -> anyhow::Result<OcrInput> {
        self.input.parse::<OcrInput>().map_err(anyhow::Error::msg)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub store: LogStoreKind,
    /// Defaults to a file in the per-user data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ocr: OcrConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `explicit` (which must exist) or from the per-user config
    /// directory, falling back to defaults when no file is there.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join(self.log.store.default_file_name()))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "labelcheck", "labelcheck")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

/// Per-user data directory, or `./.labelcheck` when no home directory is known.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".labelcheck"))
}
