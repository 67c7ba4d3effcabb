//! Assistant configuration and credential resolution
//!
//! Settings come from an optional TOML file (or the older flat `config.json`
//! layout). API keys are resolved through a [`CredentialChain`]: an ordered
//! list of providers where the first non-empty answer wins.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dialoguer::{Confirm, Password};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const OPENWEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";
pub const SPOTIFY_CLIENT_ID: &str = "SPOTIPY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET: &str = "SPOTIPY_CLIENT_SECRET";
pub const NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const GNEWS_API_KEY: &str = "GNEWS_API_KEY";

const APP_DIR: &str = "dadu";
const LOCAL_CONFIG: &str = "dadu.toml";
const LEGACY_CONFIG: &str = "config.json";

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_wake_word")]
    pub wake_word: String,
    /// Words per minute, passed to the synthesiser when it supports it
    #[serde(default = "default_speech_rate")]
    pub speech_rate: u32,
    /// External synthesiser, e.g. "espeak -s {rate}"; `{rate}` is replaced
    /// with `speech_rate`
    #[serde(default)]
    pub tts_command: Option<String>,
    #[serde(default)]
    pub music_dir: Option<PathBuf>,
    /// Used as the current location before any network lookup
    #[serde(default)]
    pub home_location: Option<String>,
    #[serde(default = "default_news_limit")]
    pub news_limit: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,

    /// File this config was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn default_wake_word() -> String {
    "dadu".to_string()
}

fn default_speech_rate() -> u32 {
    150
}

fn default_news_limit() -> usize {
    3
}

fn default_http_timeout_secs() -> u64 {
    6
}

fn default_open_browser() -> bool {
    true
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_word: default_wake_word(),
            speech_rate: default_speech_rate(),
            tts_command: None,
            music_dir: None,
            home_location: None,
            news_limit: default_news_limit(),
            http_timeout_secs: default_http_timeout_secs(),
            open_browser: default_open_browser(),
            keys: BTreeMap::new(),
            source: None,
        }
    }
}

/// Where a new config file is written when none exists yet
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG))
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG), PathBuf::from(LEGACY_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join("config.toml"));
    }
    paths
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl AssistantConfig {
    /// Load from `explicit` if given (it must exist), else from the first
    /// candidate path that exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        for path in candidate_paths() {
            if path.exists() {
                return Self::from_path(&path);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let mut config = if is_json(path) {
            Self::from_json(&content)
        } else {
            toml::from_str(&content).map_err(anyhow::Error::from)
        }
        .with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(path = %path.display(), "loaded config");
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// JSON may be either the full layout or the flat `{"KEY": "value"}` form;
    /// upper-case top-level string entries are treated as keys.
    fn from_json(content: &str) -> Result<Self> {
        let mut map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;

        let flat_keys: Vec<String> = map
            .iter()
            .filter(|(k, v)| {
                v.is_string() && k.chars().all(|c| c.is_ascii_uppercase() || c == '_')
            })
            .map(|(k, _)| k.clone())
            .collect();

        let mut keys = BTreeMap::new();
        for name in flat_keys {
            if let Some(serde_json::Value::String(value)) = map.remove(&name) {
                keys.insert(name, value);
            }
        }

        let mut config: Self = serde_json::from_value(serde_json::Value::Object(map))?;
        config.keys.extend(keys);
        Ok(config)
    }

    /// Synthesiser command line with the speech rate filled in
    pub fn tts_command_line(&self) -> Option<String> {
        self.tts_command
            .as_deref()
            .map(|cmd| cmd.replace("{rate}", &self.speech_rate.to_string()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn key(&self, name: &str) -> Option<&str> {
        self.keys
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// File new keys are persisted to
    pub fn persist_path(&self) -> PathBuf {
        self.source.clone().unwrap_or_else(default_config_path)
    }
}

/// Write `name = value` into the config file's keys, creating it if needed.
/// Other content of the file is preserved.
pub fn save_key(path: &Path, name: &str, value: &str) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let output = if is_json(path) {
        let mut map: serde_json::Map<String, serde_json::Value> = if existing.trim().is_empty() {
            serde_json::Map::new()
        } else {
            serde_json::from_str(&existing).context("Failed to parse existing JSON config")?
        };
        map.insert(name.to_string(), serde_json::Value::String(value.to_string()));
        serde_json::to_string_pretty(&map)?
    } else {
        let mut table: toml::Table =
            toml::from_str(&existing).context("Failed to parse existing TOML config")?;
        let keys = table
            .entry("keys")
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        let keys = keys
            .as_table_mut()
            .ok_or_else(|| anyhow!("`keys` in {} is not a table", path.display()))?;
        keys.insert(name.to_string(), toml::Value::String(value.to_string()));
        toml::to_string_pretty(&table)?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, output).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ============================================================================
// Credential Providers
// ============================================================================

/// One layer of credential lookup
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn lookup(&self, key: &str) -> Option<String>;
}

pub struct EnvProvider;

impl CredentialProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Keys from the loaded config file
pub struct ConfigFileProvider {
    keys: BTreeMap<String, String>,
}

impl ConfigFileProvider {
    pub fn new(keys: BTreeMap<String, String>) -> Self {
        Self { keys }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.keys.clone())
    }
}

impl CredentialProvider for ConfigFileProvider {
    fn name(&self) -> &'static str {
        "config file"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.keys
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Asks on the terminal, at most once per key per session, and offers to
/// save the answer.
pub struct PromptProvider {
    persist_to: Option<PathBuf>,
    answered: Mutex<HashMap<String, Option<String>>>,
}

impl PromptProvider {
    pub fn new(persist_to: Option<PathBuf>) -> Self {
        Self {
            persist_to,
            answered: Mutex::new(HashMap::new()),
        }
    }

    fn offer_to_save(&self, key: &str, value: &str) {
        let Some(ref path) = self.persist_to else {
            return;
        };
        let save = Confirm::new()
            .with_prompt(format!("Save this key to {}?", path.display()))
            .default(true)
            .interact()
            .unwrap_or(false);
        if !save {
            return;
        }
        match save_key(path, key, value) {
            Ok(()) => println!("Saved API key to {}", path.display()),
            Err(e) => warn!("Could not save config file; continuing without saving: {:#}", e),
        }
    }
}

impl CredentialProvider for PromptProvider {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Ok(answered) = self.answered.lock() {
            if let Some(previous) = answered.get(key) {
                return previous.clone();
            }
        }

        let value = Password::new()
            .with_prompt(format!("Enter {} (or press Enter to skip)", key))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| warn!("credential prompt failed: {}", e))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(ref v) = value {
            self.offer_to_save(key, v);
        }

        if let Ok(mut answered) = self.answered.lock() {
            answered.insert(key.to_string(), value.clone());
        }
        value
    }
}

/// Ordered providers; the first non-empty answer wins
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment, then config file, then (optionally) the terminal prompt
    pub fn standard(config: &AssistantConfig, interactive: bool) -> Self {
        let chain = Self::new()
            .with(EnvProvider)
            .with(ConfigFileProvider::from_config(config));
        if interactive {
            chain.with(PromptProvider::new(Some(config.persist_path())))
        } else {
            chain
        }
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn resolve(&self, key: &str) -> Option<String> {
        self.providers.iter().find_map(|provider| {
            let found = provider.lookup(key);
            if found.is_some() {
                debug!(key, source = provider.name(), "credential resolved");
            }
            found
        })
    }

    /// Like [`resolve`](Self::resolve) but without interactive layers
    pub fn resolve_quiet(&self, key: &str) -> Option<String> {
        self.providers
            .iter()
            .filter(|p| p.name() != "prompt")
            .find_map(|p| p.lookup(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.wake_word, "dadu");
        assert_eq!(config.speech_rate, 150);
        assert_eq!(config.news_limit, 3);
        assert_eq!(config.http_timeout(), Duration::from_secs(6));
        assert!(config.open_browser);
        assert_eq!(config.tts_command_line(), None);
    }

    #[test]
    fn test_tts_rate_placeholder() {
        let config = AssistantConfig {
            tts_command: Some("espeak -s {rate}".to_string()),
            speech_rate: 120,
            ..AssistantConfig::default()
        };
        assert_eq!(config.tts_command_line().as_deref(), Some("espeak -s 120"));
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dadu.toml");
        fs::write(
            &path,
            "wake_word = \"jarvis\"\nnews_limit = 5\n\n[keys]\nOPENWEATHER_API_KEY = \"abc\"\n",
        )
        .unwrap();

        let config = AssistantConfig::load(Some(&path)).unwrap();
        assert_eq!(config.wake_word, "jarvis");
        assert_eq!(config.news_limit, 5);
        assert_eq!(config.speech_rate, 150);
        assert_eq!(config.key(OPENWEATHER_API_KEY), Some("abc"));
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_flat_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"OPENWEATHER_API_KEY": "k1", "news_limit": 2}"#).unwrap();

        let config = AssistantConfig::load(Some(&path)).unwrap();
        assert_eq!(config.key(OPENWEATHER_API_KEY), Some("k1"));
        assert_eq!(config.news_limit, 2);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AssistantConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_save_key_toml_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        save_key(&path, NEWS_API_KEY, "n1").unwrap();

        fs::write(&path, format!("wake_word = \"hey\"\n{}", fs::read_to_string(&path).unwrap()))
            .unwrap();
        save_key(&path, GNEWS_API_KEY, "g1").unwrap();

        let config = AssistantConfig::from_path(&path).unwrap();
        assert_eq!(config.wake_word, "hey");
        assert_eq!(config.key(NEWS_API_KEY), Some("n1"));
        assert_eq!(config.key(GNEWS_API_KEY), Some("g1"));
    }

    #[test]
    fn test_save_key_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_key(&path, OPENWEATHER_API_KEY, "w1").unwrap();

        let config = AssistantConfig::from_path(&path).unwrap();
        assert_eq!(config.key(OPENWEATHER_API_KEY), Some("w1"));
    }

    struct Fixed(&'static str, Option<&'static str>);

    impl CredentialProvider for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn lookup(&self, _key: &str) -> Option<String> {
            self.1.map(String::from)
        }
    }

    #[test]
    fn test_chain_order() {
        let chain = CredentialChain::new()
            .with(Fixed("first", None))
            .with(ConfigFileProvider::new(keys(&[("K", "from-file")])))
            .with(Fixed("last", Some("from-last")));

        assert_eq!(chain.resolve("K").as_deref(), Some("from-file"));
        assert_eq!(chain.resolve("OTHER").as_deref(), Some("from-last"));
    }

    #[test]
    fn test_env_wins_over_file() {
        std::env::set_var("DADU_TEST_CHAIN_KEY", "from-env");
        let chain = CredentialChain::new()
            .with(EnvProvider)
            .with(ConfigFileProvider::new(keys(&[("DADU_TEST_CHAIN_KEY", "from-file")])));
        assert_eq!(chain.resolve("DADU_TEST_CHAIN_KEY").as_deref(), Some("from-env"));
        std::env::remove_var("DADU_TEST_CHAIN_KEY");
    }

    #[test]
    fn test_blank_values_skipped() {
        let chain = CredentialChain::new()
            .with(ConfigFileProvider::new(keys(&[("K", "   ")])))
            .with(Fixed("prompt", Some("typed")));
        assert_eq!(chain.resolve("K").as_deref(), Some("typed"));
        assert_eq!(chain.resolve_quiet("K"), None);
    }

    #[test]
    fn test_prompt_asks_once_per_key() {
        let prompt = PromptProvider::new(None);
        prompt
            .answered
            .lock()
            .unwrap()
            .insert("NEWS_API_KEY".to_string(), None);
        prompt
            .answered
            .lock()
            .unwrap()
            .insert(OPENWEATHER_API_KEY.to_string(), Some("typed".to_string()));

        // Cached answers, including a skipped key, never reach the terminal
        assert_eq!(prompt.lookup("NEWS_API_KEY"), None);
        assert_eq!(prompt.lookup(OPENWEATHER_API_KEY).as_deref(), Some("typed"));
        assert_eq!(prompt.name(), "prompt");
    }
}
