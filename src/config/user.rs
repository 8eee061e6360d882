//! User configuration: provider choice, credentials and defaults.
//!
//! Stored as a `.env`-style `KEY=VALUE` file. Process environment variables
//! with the same names override file values, so CI can run without a file.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ConfigError;

/// Environment variable pointing at an alternate user config file.
pub const CONFIG_PATH_ENV_VAR: &str = "COMMIT_CONFIG";

const PROVIDER_KEY: &str = "COMMIT_PROVIDER";
const MODEL_KEY: &str = "COMMIT_MODEL";
const DRY_RUN_KEY: &str = "COMMIT_DRY_RUN";
const DEFAULT_MODE_KEY: &str = "COMMIT_DEFAULT_MODE";

/// Every key read from the file or the environment.
const KNOWN_KEYS: [&str; 10] = [
    PROVIDER_KEY,
    MODEL_KEY,
    DRY_RUN_KEY,
    DEFAULT_MODE_KEY,
    "ANTHROPIC_API_KEY",
    "OPENAI_API_KEY",
    "XAI_API_KEY",
    "GEMINI_API_KEY",
    "AZURE_FOUNDRY_API_KEY",
    "AZURE_FOUNDRY_ENDPOINT",
];

const TEMPLATE: &str = "\
# commitsmith user configuration
#
# Provider: anthropic, openai, grok, gemini or azure-foundry
COMMIT_PROVIDER=anthropic

# Optional model override; each provider has a built-in default
# COMMIT_MODEL=

# Plan without committing (true/false)
# COMMIT_DRY_RUN=false

# smart splits changes into several commits, single makes one
# COMMIT_DEFAULT_MODE=smart

ANTHROPIC_API_KEY=
# OPENAI_API_KEY=
# XAI_API_KEY=
# GEMINI_API_KEY=
# AZURE_FOUNDRY_API_KEY=
# AZURE_FOUNDRY_ENDPOINT=
";

/// Supported LLM back-ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Grok,
    Gemini,
    AzureFoundry,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Grok => "grok",
            ProviderKind::Gemini => "gemini",
            ProviderKind::AzureFoundry => "azure-foundry",
        }
    }

    /// Keys that must be set for this provider to be usable.
    pub fn credential_keys(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Anthropic => &["ANTHROPIC_API_KEY"],
            ProviderKind::OpenAi => &["OPENAI_API_KEY"],
            ProviderKind::Grok => &["XAI_API_KEY"],
            ProviderKind::Gemini => &["GEMINI_API_KEY"],
            ProviderKind::AzureFoundry => &["AZURE_FOUNDRY_API_KEY", "AZURE_FOUNDRY_ENDPOINT"],
        }
    }

    /// Model used when `COMMIT_MODEL` is unset or empty.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-sonnet-4-20250514",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Grok => "grok-3-mini",
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::AzureFoundry => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "grok" => Ok(ProviderKind::Grok),
            "gemini" => Ok(ProviderKind::Gemini),
            "azure-foundry" => Ok(ProviderKind::AzureFoundry),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

/// How changes are grouped into commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Split into small, coherent commits.
    #[default]
    Smart,
    /// One commit covering every file.
    Single,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitMode::Smart => "smart",
            CommitMode::Single => "single",
        }
    }
}

impl FromStr for CommitMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(CommitMode::Smart),
            "single" => Ok(CommitMode::Single),
            _ => Err(ConfigError::InvalidDefaultMode(s.to_string())),
        }
    }
}

/// Resolved, validated user configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct UserConfig {
    pub provider: ProviderKind,
    /// Explicit model override; see [`UserConfig::model`].
    pub model_override: Option<String>,
    pub dry_run: bool,
    pub default_mode: CommitMode,
    credentials: HashMap<String, String>,
}

// Credentials must never reach logs
impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.credentials.keys().collect();
        keys.sort();
        f.debug_struct("UserConfig")
            .field("provider", &self.provider)
            .field("model_override", &self.model_override)
            .field("dry_run", &self.dry_run)
            .field("default_mode", &self.default_mode)
            .field("credentials", &keys)
            .finish()
    }
}

impl UserConfig {
    /// Build a config from raw key/value pairs.
    ///
    /// `provider_override` (the `--provider` flag) wins over `COMMIT_PROVIDER`.
    pub fn from_values(
        values: &HashMap<String, String>,
        provider_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| values.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let provider: ProviderKind = match provider_override.or_else(|| get(PROVIDER_KEY)) {
            Some(name) => name.parse()?,
            None => return Err(ConfigError::ProviderNotConfigured),
        };

        let mut credentials = HashMap::new();
        for &key in provider.credential_keys() {
            match get(key) {
                Some(value) => {
                    credentials.insert(key.to_string(), value.to_string());
                }
                None => {
                    return Err(ConfigError::MissingApiKey {
                        provider: provider.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }

        let default_mode = match get(DEFAULT_MODE_KEY) {
            Some(mode) => mode.parse()?,
            None => CommitMode::default(),
        };

        let dry_run = match get(DRY_RUN_KEY) {
            Some(value) => parse_bool(value).unwrap_or_else(|| {
                warn!("Invalid {} value '{}', using false", DRY_RUN_KEY, value);
                false
            }),
            None => false,
        };

        Ok(Self {
            provider,
            model_override: get(MODEL_KEY).map(str::to_string),
            dry_run,
            default_mode,
            credentials,
        })
    }

    /// Configured model, or the provider's default.
    pub fn model(&self) -> String {
        self.model_override
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// A credential required by the selected provider.
    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }
}

/// Parse `bool`-like config values.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse `KEY=VALUE` lines.
///
/// `#` starts a comment line, blank lines are skipped, an optional `export `
/// prefix is accepted and matching surrounding `"` or `'` quotes are
/// stripped from values. `path` is only used in errors.
pub fn parse_env_file(text: &str, path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut values = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let parse_error = || ConfigError::EnvParse {
            path: path.to_path_buf(),
            line: index + 1,
            content: raw.to_string(),
        };

        let (key, value) = line.split_once('=').ok_or_else(parse_error)?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(parse_error());
        }

        values.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }

    Ok(values)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Overlay non-empty process environment variables onto `values`.
fn apply_env_overrides(values: &mut HashMap<String, String>) {
    for key in KNOWN_KEYS {
        if let Ok(value) = env::var(key)
            && !value.trim().is_empty()
        {
            debug!("{} taken from environment", key);
            values.insert(key.to_string(), value);
        }
    }
}

/// `$COMMIT_CONFIG`, or `commitsmith/config` under the platform config directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("commitsmith").join("config"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Load the user config at `path`, applying environment overrides.
///
/// A missing file is only an error when the environment does not name a
/// provider either.
pub fn load_user_config(
    path: &Path,
    provider_override: Option<&str>,
) -> Result<UserConfig, ConfigError> {
    let mut values = match std::fs::read_to_string(path) {
        Ok(text) => parse_env_file(&text, path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let env_has_provider = env::var(PROVIDER_KEY).is_ok_and(|v| !v.trim().is_empty());
            if !env_has_provider && provider_override.is_none() {
                return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
            }
            debug!("No user config at {}, using environment only", path.display());
            HashMap::new()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    apply_env_overrides(&mut values);
    let config = UserConfig::from_values(&values, provider_override)?;
    debug!(provider = %config.provider, model = %config.model(), "Loaded user config");
    Ok(config)
}

/// Write a commented template to `path`, readable only by the owner.
///
/// Refuses to overwrite an existing file.
pub fn init_user_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    let write_error = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_error)?;

    let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(write_error)?;
    file.write_all(TEMPLATE.as_bytes()).map_err(write_error)?;
    file.flush().map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(write_error)?;
    }

    file.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            ConfigError::AlreadyExists(path.to_path_buf())
        } else {
            write_error(e.error)
        }
    })?;

    debug!("Wrote config template to {}", path.display());
    Ok(())
}
