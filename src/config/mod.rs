/// Configuration system for pollen-gauge.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::AppConfig::default()`]
/// 2. **User global config**: `~/.pollen-gauge/config.toml`
/// 3. **Project local config**: `.pollen-gauge.toml` in the working directory
/// 4. **Environment variables**: `POLLEN_GAUGE_*` overrides (highest precedence)
///
/// Later layers override earlier ones key by key: a project file that only
/// sets `[web] addr` keeps the API key from the global file. A layer that does
/// not parse is ignored as a whole.
///
/// # Usage
///
/// ```rust,ignore
/// use pollen_gauge::config;
///
/// let cfg = config::load();
/// let fetcher = DataFetcher::live(FetcherConfig::from_app_config(&cfg));
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::categories::parse_category_codes;
use crate::model::Interval;

pub use schema::AppConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration: defaults → global TOML → project
/// TOML → env vars.
pub fn load() -> AppConfig {
    let layers: Vec<PathBuf> = [global_config_path(), project_config_path()]
        .into_iter()
        .flatten()
        .collect();

    let mut config = load_layers(&layers);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the built-in defaults, in order. Missing
/// or malformed files are skipped.
pub fn load_layers(paths: &[PathBuf]) -> AppConfig {
    let Ok(mut merged) = toml::Value::try_from(AppConfig::default()) else {
        return AppConfig::default();
    };

    for path in paths {
        if let Some(layer) = load_toml_value(path) {
            merge_values(&mut merged, layer);
        }
    }

    merged.try_into().unwrap_or_default()
}

/// Read a TOML file as a raw value, if it exists and matches the schema.
fn load_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Validate against the schema so one bad key cannot poison the merge.
    value.clone().try_into::<AppConfig>().ok()?;
    Some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; any
/// other value replaces the base value.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.pollen-gauge/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pollen-gauge").join("config.toml"))
}

/// `.pollen-gauge.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".pollen-gauge.toml"))
}

/// Path to the global config file, for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Path to the project config file, for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `POLLEN_GAUGE_API_URL`: sensor endpoint
/// - `POLLEN_GAUGE_API_KEY`: value for the `X-Ps-Key` header
/// - `POLLEN_GAUGE_API_TIMEOUT_MS`: request timeout
/// - `POLLEN_GAUGE_INTERVAL`: default interval (`hour`/`day`)
/// - `POLLEN_GAUGE_CATEGORIES`: default category codes, comma separated
/// - `POLLEN_GAUGE_TIMEZONE`: display timezone
/// - `POLLEN_GAUGE_CACHE`: cache enabled (`1`/`true`/`yes`/`on`)
/// - `POLLEN_GAUGE_CACHE_MAX_AGE_MS`: cache freshness window
/// - `POLLEN_GAUGE_LOG`: activity log enabled
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(val) = std::env::var("POLLEN_GAUGE_API_URL")
        && !val.is_empty()
    {
        config.api.url = val;
    }
    if let Ok(val) = std::env::var("POLLEN_GAUGE_API_KEY")
        && !val.is_empty()
    {
        config.api.key = val;
    }
    if let Ok(val) = std::env::var("POLLEN_GAUGE_API_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }

    if let Ok(val) = std::env::var("POLLEN_GAUGE_INTERVAL")
        && let Some(interval) = Interval::parse(&val)
    {
        config.request.default_interval = interval;
    }
    if let Ok(val) = std::env::var("POLLEN_GAUGE_CATEGORIES")
        && !val.trim().is_empty()
    {
        config.request.default_categories =
            parse_category_codes(Some(&val), &config.request.default_categories);
    }
    if let Ok(val) = std::env::var("POLLEN_GAUGE_TIMEZONE")
        && !val.is_empty()
    {
        config.request.timezone = val;
    }

    if let Ok(val) = std::env::var("POLLEN_GAUGE_CACHE") {
        config.cache.enabled = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("POLLEN_GAUGE_CACHE_MAX_AGE_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.cache.max_age_ms = ms;
    }

    if let Ok(val) = std::env::var("POLLEN_GAUGE_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
pub fn is_truthy(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.pollen-gauge/config.toml`.
///
/// Fails if the file already exists unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.pollen-gauge/ directory")?;
    }

    fs::write(&path, AppConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (e.g. `api.key`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)?;
    Ok(path)
}

/// Set a dotted key in the config file at `path`, creating it from the
/// defaults when missing. The result must still match the schema.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(AppConfig::default()).context("failed to serialize defaults")?
    };

    set_toml_value(&mut root, key, value)?;

    root.clone()
        .try_into::<AppConfig>()
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path. The type of the
/// built-in default for `key` decides how `raw_value` is parsed; sections
/// missing from `root` are created.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("invalid config key: '{key}'");
    }

    let defaults =
        toml::Value::try_from(AppConfig::default()).context("failed to serialize defaults")?;
    let mut template = &defaults;
    for &part in &parts {
        template = template
            .get(part)
            .with_context(|| format!("unknown config key: '{key}'"))?;
    }

    let new_value = match template {
        toml::Value::Boolean(_) => toml::Value::Boolean(is_truthy(raw_value)),
        toml::Value::Integer(_) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        toml::Value::Float(_) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        toml::Value::Array(_) => toml::Value::Array(
            raw_value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        ),
        toml::Value::Table(_) => anyhow::bail!("'{key}' is a section, not a value"),
        _ => toml::Value::String(raw_value.to_string()),
    };

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{part}' in '{key}'"))?
            .entry(part)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    let leaf = parts[parts.len() - 1];
    current
        .as_table_mut()
        .with_context(|| format!("expected table for '{key}'"))?
        .insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults.
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// The effective config as TOML, with the API key masked.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config.redacted()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pollen-gauge-config-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn no_layers_gives_defaults() {
        assert_eq!(load_layers(&[]), AppConfig::default());
        assert_eq!(
            load_layers(&[PathBuf::from("/nonexistent/pollen-gauge.toml")]),
            AppConfig::default()
        );
    }

    #[test]
    fn later_layers_override_key_by_key() {
        let dir = scratch_dir("layers");
        let global = dir.join("global.toml");
        let project = dir.join("project.toml");
        fs::write(&global, "[api]\nurl = \"https://a.test\"\nkey = \"k1\"\n").unwrap();
        fs::write(&project, "[api]\nurl = \"https://b.test\"\n[web]\naddr = \"0.0.0.0:1\"\n")
            .unwrap();

        let config = load_layers(&[global, project]);
        assert_eq!(config.api.url, "https://b.test");
        assert_eq!(config.api.key, "k1");
        assert_eq!(config.web.addr, "0.0.0.0:1");
        assert_eq!(config.cache.max_age_ms, 3_600_000);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_layer_is_ignored() {
        let dir = scratch_dir("malformed");
        let good = dir.join("good.toml");
        let bad = dir.join("bad.toml");
        fs::write(&good, "[cache]\nmax_age_ms = 5000\n").unwrap();
        fs::write(&bad, "[cache]\nmax_age_ms = \"soon\"\n").unwrap();

        let config = load_layers(&[good, bad]);
        assert_eq!(config.cache.max_age_ms, 5000);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn is_truthy_accepts_variants() {
        for val in ["1", "true", "TRUE", "yes", "on", " On "] {
            assert!(is_truthy(val), "{val}");
        }
        for val in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(val), "{val}");
        }
    }

    #[test]
    fn set_toml_value_respects_types() {
        let mut root: toml::Value = toml::Value::try_from(AppConfig::default()).unwrap();
        set_toml_value(&mut root, "cache.enabled", "false").unwrap();
        set_toml_value(&mut root, "cache.max_age_ms", "60000").unwrap();
        set_toml_value(&mut root, "request.default_categories", "POL, GRA").unwrap();
        set_toml_value(&mut root, "api.key", "abc").unwrap();

        let config: AppConfig = root.try_into().unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_age_ms, 60_000);
        assert_eq!(config.request.default_categories, vec!["POL", "GRA"]);
        assert_eq!(config.api.key, "abc");
    }

    #[test]
    fn set_toml_value_rejects_bad_keys_and_values() {
        let mut root: toml::Value = toml::Value::try_from(AppConfig::default()).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "x").is_err());
        assert!(set_toml_value(&mut root, "api.nope", "x").is_err());
        assert!(set_toml_value(&mut root, "cache.max_age_ms", "an hour").is_err());
        assert!(set_toml_value(&mut root, "api.", "x").is_err());
        assert!(set_toml_value(&mut root, "api", "x").is_err());
    }

    #[test]
    fn set_toml_value_fills_missing_sections() {
        let mut root: toml::Value = toml::from_str("[api]\nkey = \"k\"\n").unwrap();
        set_toml_value(&mut root, "cache.max_age_ms", "1000").unwrap();

        let config: AppConfig = root.try_into().unwrap();
        assert_eq!(config.api.key, "k");
        assert_eq!(config.cache.max_age_ms, 1000);
        assert!(config.cache.enabled);
    }

    #[test]
    fn set_value_at_creates_file_and_validates() {
        let dir = scratch_dir("set");
        let path = dir.join("config.toml");

        set_config_value_at(&path, "request.default_interval", "day").unwrap();
        let config = load_layers(std::slice::from_ref(&path));
        assert_eq!(config.request.default_interval, Interval::Day);

        assert!(set_config_value_at(&path, "request.default_interval", "week").is_err());
        let config = load_layers(std::slice::from_ref(&path));
        assert_eq!(config.request.default_interval, Interval::Day);

        let _ = fs::remove_dir_all(dir);
    }
}
