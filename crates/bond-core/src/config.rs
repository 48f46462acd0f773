#![forbid(unsafe_code)]

//! Engine configuration (deterministic, env-overridable).
//!
//! # Environment Variables
//! - `BOND_POINTER_SEARCH` = linear|binary
//! - `BOND_VERIFY_POINTERS` (bool)
//! - `BOND_CASCADE_WARN_DEPTH` (usize, > 0)
//!
//! Unknown or malformed values are reported through
//! [`BondConfig::from_env_with_diagnostics`] and otherwise ignored; the
//! default for that field stays in effect.

use std::env;
use std::fmt;
use std::sync::OnceLock;

const ENV_POINTER_SEARCH: &str = "BOND_POINTER_SEARCH";
const ENV_VERIFY_POINTERS: &str = "BOND_VERIFY_POINTERS";
const ENV_CASCADE_WARN_DEPTH: &str = "BOND_CASCADE_WARN_DEPTH";

static GLOBAL: OnceLock<BondConfig> = OnceLock::new();

/// Strategy for locating the first pointer `>=` a source index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerSearch {
    /// Scan from the front.
    Linear,
    /// `partition_point` over the sorted pointer list.
    Binary,
}

impl PointerSearch {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linear" | "scan" => Some(Self::Linear),
            "binary" | "bisect" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for PointerSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::Binary => "binary",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondConfig {
    pub pointer_search: PointerSearch,
    /// Assert index-map consistency after every filtered-view patch.
    pub verify_pointers: bool,
    /// Nested dispatch depth at which a warning is logged.
    pub cascade_warn_depth: usize,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            pointer_search: PointerSearch::Binary,
            verify_pointers: cfg!(debug_assertions),
            cascade_warn_depth: 64,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct BondConfigParse {
    pub config: BondConfig,
    pub errors: Vec<BondConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl BondConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BondConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for BondConfigError {}

impl BondConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> BondConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> BondConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Process-wide config, read from the environment on first use.
    pub fn global() -> &'static BondConfig {
        GLOBAL.get_or_init(|| {
            let parsed = Self::from_env_with_diagnostics();
            for err in &parsed.errors {
                tracing::warn!(%err, "ignoring invalid bond config value");
            }
            parsed.config
        })
    }

    /// Install `config` as the process-wide config. Fails (returning the
    /// config back) if [`BondConfig::global`] was already initialised.
    pub fn install(config: BondConfig) -> Result<(), BondConfig> {
        GLOBAL.set(config)
    }

    #[must_use]
    pub fn with_pointer_search(mut self, search: PointerSearch) -> Self {
        self.pointer_search = search;
        self
    }

    #[must_use]
    pub fn with_verify_pointers(mut self, verify: bool) -> Self {
        self.verify_pointers = verify;
        self
    }

    #[must_use]
    pub fn with_cascade_warn_depth(mut self, depth: usize) -> Self {
        self.cascade_warn_depth = depth;
        self
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<BondConfigError>> {
        let mut errors = Vec::new();
        if self.cascade_warn_depth == 0 {
            errors.push(BondConfigError::new(
                "cascade_warn_depth",
                "0",
                "must be greater than zero",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn from_env_with<F>(mut get: F) -> BondConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = BondConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_POINTER_SEARCH) {
        match PointerSearch::parse(&value) {
            Some(parsed) => config.pointer_search = parsed,
            None => errors.push(BondConfigError::new(
                "pointer_search",
                value,
                "expected linear|binary",
            )),
        }
    }

    if let Some(value) = get(ENV_VERIFY_POINTERS) {
        match parse_bool(&value) {
            Some(parsed) => config.verify_pointers = parsed,
            None => errors.push(BondConfigError::new(
                "verify_pointers",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    if let Some(value) = get(ENV_CASCADE_WARN_DEPTH) {
        match parse_usize(&value) {
            Some(parsed) if parsed > 0 => config.cascade_warn_depth = parsed,
            _ => errors.push(BondConfigError::new(
                "cascade_warn_depth",
                value,
                "expected positive integer",
            )),
        }
    }

    BondConfigParse { config, errors }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}
