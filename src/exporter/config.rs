use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExporterError;
use crate::exporter::util::expand_tilde;

pub const DEFAULT_DB: &str = "~/Library/Application Support/com.meetily.ai/meeting_minutes.sqlite";
pub const DEFAULT_OUTPUT: &str = "~/Documents/MeetilyExporter";
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub db: PathBuf,
    pub output: PathBuf,
    pub interval_secs: u64,
    pub notify: bool,
}

/// One layer of settings: the config file, the environment, or CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialExporterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
}

impl PartialExporterConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Copy every value set in `other` over this layer.
    pub fn merge_from(&mut self, other: &PartialExporterConfig) {
        if other.db.is_some() {
            self.db = other.db.clone();
        }
        if other.output.is_some() {
            self.output = other.output.clone();
        }
        if other.interval.is_some() {
            self.interval = other.interval;
        }
        if other.notify.is_some() {
            self.notify = other.notify;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    Default,
    File,
    Env,
    Flag,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::File => "from config",
            Self::Env => "from env",
            Self::Flag => "from flag",
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettingOrigins {
    pub db: SettingSource,
    pub output: SettingSource,
    pub interval: SettingSource,
    pub notify: SettingSource,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ExporterConfig,
    pub origins: SettingOrigins,
    pub file_path: Option<PathBuf>,
}

fn env_string(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_u64(var: &str) -> Option<u64> {
    env_string(var).and_then(|v| v.parse::<u64>().ok())
}

fn env_bool(var: &str) -> Option<bool> {
    match env_string(var)?.as_str() {
        "1" | "true" | "TRUE" | "yes" | "on" => Some(true),
        "0" | "false" | "FALSE" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_layer() -> PartialExporterConfig {
    PartialExporterConfig {
        db: env_string("MEETILY_EXPORTER_DB"),
        output: env_string("MEETILY_EXPORTER_OUTPUT"),
        interval: env_u64("MEETILY_EXPORTER_INTERVAL_SECS"),
        notify: env_bool("MEETILY_EXPORTER_NOTIFY"),
    }
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_string("MEETILY_EXPORTER_CONFIG_PATH") {
        return Some(PathBuf::from(expand_tilde(&custom)));
    }

    let home = dirs::home_dir()?;
    Some(home.join(".config").join("meetily-exporter").join("config.toml"))
}

/// Read the config file. A file that does not exist is an empty layer.
pub fn load_file_layer(path: &Path) -> Result<PartialExporterConfig> {
    if !path.exists() {
        return Ok(PartialExporterConfig::default());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&raw).map_err(|err| {
        ExporterError::InvalidConfig(format!("failed to parse {}: {err}", path.display())).into()
    })
}

pub fn save_file_layer(path: &Path, layer: &PartialExporterConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = toml::to_string(layer).context("failed to serialize config")?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn pick<T: Clone>(
    layers: [(&Option<T>, SettingSource); 3],
    fallback: T,
) -> (T, SettingSource) {
    for (value, source) in layers {
        if let Some(value) = value {
            return (value.clone(), source);
        }
    }
    (fallback, SettingSource::Default)
}

/// Flags beat the environment, the environment beats the file, the file
/// beats built-in defaults.
pub fn resolve_layers(
    file: &PartialExporterConfig,
    env: &PartialExporterConfig,
    flags: &PartialExporterConfig,
) -> Result<(ExporterConfig, SettingOrigins)> {
    let (db, db_src) = pick(
        [
            (&flags.db, SettingSource::Flag),
            (&env.db, SettingSource::Env),
            (&file.db, SettingSource::File),
        ],
        DEFAULT_DB.to_string(),
    );
    let (output, output_src) = pick(
        [
            (&flags.output, SettingSource::Flag),
            (&env.output, SettingSource::Env),
            (&file.output, SettingSource::File),
        ],
        DEFAULT_OUTPUT.to_string(),
    );
    let (interval_secs, interval_src) = pick(
        [
            (&flags.interval, SettingSource::Flag),
            (&env.interval, SettingSource::Env),
            (&file.interval, SettingSource::File),
        ],
        DEFAULT_INTERVAL_SECS,
    );
    let (notify, notify_src) = pick(
        [
            (&flags.notify, SettingSource::Flag),
            (&env.notify, SettingSource::Env),
            (&file.notify, SettingSource::File),
        ],
        true,
    );

    let cfg = ExporterConfig {
        db: PathBuf::from(expand_tilde(&db)),
        output: PathBuf::from(expand_tilde(&output)),
        interval_secs,
        notify,
    };
    validate(&cfg)?;

    Ok((
        cfg,
        SettingOrigins {
            db: db_src,
            output: output_src,
            interval: interval_src,
            notify: notify_src,
        },
    ))
}

fn validate(cfg: &ExporterConfig) -> Result<()> {
    if cfg.interval_secs == 0 {
        return Err(ExporterError::InvalidConfig(
            "invalid poll interval: must be >= 1 second".to_string(),
        )
        .into());
    }
    Ok(())
}

pub fn load_config(flags: &PartialExporterConfig) -> Result<ResolvedConfig> {
    let file_path = resolve_config_path();
    let file = match &file_path {
        Some(path) => load_file_layer(path)?,
        None => PartialExporterConfig::default(),
    };
    let (config, origins) = resolve_layers(&file, &env_layer(), flags)?;
    Ok(ResolvedConfig {
        config,
        origins,
        file_path,
    })
}
