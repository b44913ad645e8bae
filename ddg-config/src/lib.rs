//! Loader for ddg-search configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, the per-user file
//! (`<config dir>/ddg-search/config.yaml`, optional), an explicit file or
//! inline YAML, then `DDG_`-prefixed environment variables using `__` as the
//! nesting separator (e.g. `DDG_SEARCH__PAGES=3`). String values may contain
//! `${VAR}` placeholders which are expanded after merging.
//!
//! ```yaml
//! search:
//!   format: markdown
//!   pages: 3
//!   region: us-en
//! http:
//!   timeout_secs: 20
//! delay:
//!   min_ms: 1000
//!   max_ms: 3000
//! logging:
//!   filter: "ddg_web=debug,info"
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const CONFIG_FILE_NAME: &str = "config.yaml";

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";
pub const DEFAULT_USER_AGENT: &str = concat!("ddg-search/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DdgConfig {
    pub search: SearchSection,
    pub http: HttpSection,
    pub delay: DelaySection,
    pub logging: LoggingSection,
}

/// Defaults for CLI options that were not passed explicitly.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub format: String,
    /// Page cap; 0 means unlimited.
    pub pages: u32,
    pub region: Option<String>,
    pub time: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            format: "json".into(),
            pages: 5,
            region: None,
            time: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retries: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_secs: 15,
            retries: 0,
        }
    }
}

/// Bounds of the randomized pause between page fetches, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelaySection {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelaySection {
    fn default() -> Self {
        Self {
            min_ms: 800,
            max_ms: 2900,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub filter: String,
    pub json: bool,
    pub stderr: bool,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
            stderr: false,
            dir: None,
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Path of the per-user config file, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(ddg_common::APP_NAME).join(CONFIG_FILE_NAME))
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct DdgConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for DdgConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DdgConfigLoader {
    /// Start from built-in defaults; env overrides are attached in [`load`](Self::load).
    ///
    /// ```
    /// use ddg_config::DdgConfigLoader;
    ///
    /// let config = DdgConfigLoader::new()
    ///     .with_yaml_str("search:\n  pages: 2")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.search.pages, 2);
    /// assert_eq!(config.search.format, "json");
    /// assert_eq!(config.delay.min_ms, 800);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach the per-user config file when it exists.
    pub fn with_default_file(self) -> Self {
        match default_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use ddg_config::DdgConfigLoader;
    ///
    /// let cfg = DdgConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// search:
    ///   format: csv
    ///   region: uk-en
    /// delay:
    ///   min_ms: 0
    ///   max_ms: 0
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.search.format, "csv");
    /// assert_eq!(cfg.search.region.as_deref(), Some("uk-en"));
    /// assert_eq!(cfg.delay.max_ms, 0);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// `DDG_`-prefixed environment variables are layered on top of every file
    /// source, then `${VAR}` placeholders are expanded.
    ///
    /// ```
    /// use ddg_config::DdgConfigLoader;
    ///
    /// unsafe { std::env::set_var("DDG_DOCTEST_AGENT", "agent-from-env"); }
    ///
    /// let config = DdgConfigLoader::new()
    ///     .with_yaml_str("http:\n  user_agent: \"${DDG_DOCTEST_AGENT}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.http.user_agent, "agent-from-env");
    ///
    /// unsafe { std::env::remove_var("DDG_DOCTEST_AGENT"); }
    /// ```
    pub fn load(self) -> Result<DdgConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("DDG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: DdgConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        if typed.delay.min_ms > typed.delay.max_ms {
            return Err(ConfigError::Message(format!(
                "delay.min_ms ({}) must not exceed delay.max_ms ({})",
                typed.delay.min_ms, typed.delay.max_ms
            )));
        }

        Ok(typed)
    }
}
