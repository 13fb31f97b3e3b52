use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::parks::{self, Park};

// ── Profile ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Base URL of the answering service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Access key exchanged for a session token at startup
    #[serde(default)]
    pub key: Option<String>,
    /// Park short code (gl, fv, km, ss). Unknown codes fall back to the group default.
    #[serde(default = "default_park")]
    pub park: String,
    /// Optional Referer header sent with every request
    #[serde(default)]
    pub referer: Option<String>,
    /// Optional HTTP timeout in seconds. Unset means no client-side timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Put a failed query back into the input box. Default: false.
    #[serde(default)]
    pub restore_draft_on_failure: bool,
    /// Show message times in the history pane
    #[serde(default)]
    pub show_timestamps: bool,
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_park() -> String {
    "gl".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            key: None,
            park: default_park(),
            referer: None,
            timeout_secs: None,
            restore_draft_on_failure: false,
            show_timestamps: false,
        }
    }
}

// ── Config file ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Which profile to use when none is specified
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            profiles: HashMap::new(),
        }
    }
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        Self::write_default_to(&path)?;
        Ok(path)
    }

    pub fn write_default_to(path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Failed to write config file at {}", path.display()))
    }

    /// Resolve the active profile given an optional override name.
    pub fn resolve_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let key = name.unwrap_or(&self.default_profile);
        self.profiles.get(key)
    }

    /// Profile names, sorted, default first.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_by_key(|n| (*n != self.default_profile, *n));
        names
    }
}

// ── Resolved runtime config (after merging file + CLI overrides) ──────────────

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub profile: Option<&'a str>,
    pub endpoint: Option<&'a str>,
    pub key: Option<&'a str>,
    pub park: Option<&'a str>,
    pub timestamps: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub endpoint: String,
    pub key: Option<String>,
    pub park: Park,
    pub referer: Option<String>,
    pub timeout: Option<Duration>,
    pub restore_draft_on_failure: bool,
    pub show_timestamps: bool,
    /// Profile name that was resolved (for display)
    pub profile_name: String,
}

impl ResolvedConfig {
    /// Merge config file profile with CLI overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file profile > built-in defaults
    pub fn resolve(file: &ConfigFile, overrides: &Overrides<'_>) -> Self {
        let profile_name = overrides
            .profile
            .unwrap_or(&file.default_profile)
            .to_string();

        let base = file
            .resolve_profile(overrides.profile)
            .cloned()
            .unwrap_or_default();

        let park_code = overrides.park.map(str::to_string).unwrap_or(base.park);
        let park = parks::resolve(&park_code);
        if park == parks::DEFAULT_PARK {
            tracing::debug!(code = %park_code, "unknown park code, using group default");
        }

        Self {
            endpoint: overrides
                .endpoint
                .map(str::to_string)
                .unwrap_or(base.endpoint),
            key: overrides.key.map(str::to_string).or(base.key),
            park,
            referer: base.referer,
            timeout: base.timeout_secs.map(Duration::from_secs),
            restore_draft_on_failure: base.restore_draft_on_failure,
            show_timestamps: overrides.timestamps || base.show_timestamps,
            profile_name,
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    dirs_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("backster")
        .join("config.toml")
}

fn dirs_config_dir() -> Option<PathBuf> {
    // XDG_CONFIG_HOME or ~/.config
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

// ── Default config template written on first run ──────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# Backster configuration
# Run `backster --init` to regenerate this file.

default_profile = "local"

# ── Local answering service ──────────────────────────────────────────────────
[profiles.local]
endpoint = "http://localhost:8000"
park     = "gl"
# key    = "..."          # access key exchanged for a session token

# ── Staging ──────────────────────────────────────────────────────────────────
# [profiles.staging]
# endpoint     = "https://backster-staging.example.com"
# key          = "..."
# park         = "km"
# referer      = "https://intranet.example.com/"
# timeout_secs = 60

# ── Park codes ───────────────────────────────────────────────────────────────
# gl  Gröna Lund
# fv  Furuvik
# km  Kolmården
# ss  Skara Sommarland
# Any other code uses the group-wide "Parks and Resorts" knowledge base.

# ── Behaviour (optional, per-profile) ────────────────────────────────────────
# restore_draft_on_failure = false   # put a failed question back in the input box
# show_timestamps = false            # show message times in the history pane
"#;
