//! Configuration model and loading for tag evaluation.

use crate::error::{DevtagError, DevtagResult};
use directories_next::ProjectDirs;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/devtag.toml";
pub const CONFIG_PATH_ENV: &str = "DEVTAG_CONFIG";
const USER_CONFIG_FILE_NAME: &str = "devtag.toml";
const APP_QUALIFIER: &str = "org";
const APP_ORGANIZATION: &str = "devtag";
const APP_NAME: &str = "devtag";

/// Resolution method applied to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EvalMethod {
    /// Follow the udev-maintained `/dev/disk/by-*` links and verify the target.
    #[serde(alias = "link")]
    Udev,
    /// Ask the device-metadata cache.
    #[serde(alias = "cache")]
    Scan,
}

impl EvalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMethod::Udev => "udev",
            EvalMethod::Scan => "scan",
        }
    }
}

impl fmt::Display for EvalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluation policy: which methods to try, in which order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluateCfg {
    #[serde(default = "default_order")]
    pub order: Vec<EvalMethod>,

    /// Ask the kernel to regenerate links when a stale link is detected.
    #[serde(default = "default_send_uevent")]
    pub send_uevent: bool,
}

fn default_order() -> Vec<EvalMethod> {
    vec![EvalMethod::Udev, EvalMethod::Scan]
}

fn default_send_uevent() -> bool {
    true
}

impl Default for EvaluateCfg {
    fn default() -> Self {
        Self {
            order: default_order(),
            send_uevent: default_send_uevent(),
        }
    }
}

impl EvaluateCfg {
    pub fn new(order: Vec<EvalMethod>, send_uevent: bool) -> Self {
        Self { order, send_uevent }
    }
}

/// Top-level configuration snapshot loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DevtagConfig {
    #[serde(default)]
    pub evaluate: EvaluateCfg,
}

impl DevtagConfig {
    /// Read a config file, picking TOML or YAML from the extension.
    pub fn load<P: AsRef<Path>>(path: P) -> DevtagResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_toml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("toml")
        );
        let cfg = if is_toml {
            toml::from_str::<Self>(&contents)?
        } else {
            serde_yaml::from_str::<Self>(&contents)?
        };
        Ok(cfg)
    }

    /// Best-effort validation pass returning human-readable issues.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.evaluate.order.is_empty() {
            issues.push("evaluate.order is empty; every tag will stay unresolved".to_string());
        }

        let mut seen = HashSet::new();
        for method in &self.evaluate.order {
            if !seen.insert(*method) {
                issues.push(format!("evaluate.order lists `{method}` more than once"));
            }
        }

        issues
    }
}

/// Source of the evaluation policy, consulted once per evaluation.
pub trait ConfigSource {
    fn load(&self) -> DevtagResult<EvaluateCfg>;
}

impl ConfigSource for EvaluateCfg {
    fn load(&self) -> DevtagResult<EvaluateCfg> {
        Ok(self.clone())
    }
}

/// Configuration read from disk on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: Option<PathBuf>,
}

impl ConfigFile {
    /// Use exactly `path`; a missing file yields defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Locate the configuration the way system tools expect.
    ///
    /// `DEVTAG_CONFIG` wins, then `/etc/devtag.toml`, then the per-user config
    /// directory. When none exists the built-in defaults apply.
    pub fn discover() -> Self {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Self::new(path);
            }
        }

        let system = Path::new(DEFAULT_CONFIG_PATH);
        if system.exists() {
            return Self::new(system);
        }

        match Self::user_config_path().filter(|path| path.exists()) {
            Some(user) => Self::new(user),
            None => Self { path: None },
        }
    }

    /// Resolve the per-user configuration path.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the full configuration snapshot.
    pub fn load_config(&self) -> DevtagResult<DevtagConfig> {
        let Some(path) = &self.path else {
            debug!("no configuration file found; using defaults");
            return Ok(DevtagConfig::default());
        };

        match DevtagConfig::load(path) {
            Ok(cfg) => {
                for issue in cfg.validate() {
                    warn!("{}: {issue}", path.display());
                }
                Ok(cfg)
            }
            Err(DevtagError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found; using defaults", path.display());
                Ok(DevtagConfig::default())
            }
            Err(err) => Err(DevtagError::InvalidConfig(format!(
                "failed to load {}: {err}",
                path.display()
            ))),
        }
    }
}

impl ConfigSource for ConfigFile {
    fn load(&self) -> DevtagResult<EvaluateCfg> {
        self.load_config().map(|cfg| cfg.evaluate)
    }
}
