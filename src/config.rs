//! Settings for import insertion and indexing
//!
//! Settings are layered TOML tables: built-in defaults, then the user config
//! (`<config dir>/import-helper/config.toml`), then the project file
//! (`.import-helper.toml` at the import root). Every accessor falls back to a
//! documented default instead of failing.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::exclusion::ExclusionMatcher;
use crate::models::AliasRule;
use crate::paths::lexical_normalize;

/// Project-level settings file, looked up at the import root
pub const PROJECT_CONFIG_FILE: &str = ".import-helper.toml";

const DEFAULT_SETTINGS: &str = r#"
insert_position = "end"
from_quote = "'"
space_around_braces = false
from_semicolon = false
package_keys = ["dependencies", "devDependencies"]
resolver_command = "node"
resolver_timeout_ms = 5000
"#;

/// Quote character around module specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
pub enum QuoteChar {
    #[strum(serialize = "'")]
    Single,
    #[strum(serialize = "\"")]
    Double,
}

impl QuoteChar {
    pub fn as_char(self) -> char {
        match self {
            QuoteChar::Single => '\'',
            QuoteChar::Double => '"',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '\'' => Some(QuoteChar::Single),
            '"' => Some(QuoteChar::Double),
            _ => None,
        }
    }
}

/// Rendering style for import statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStyle {
    pub quote: QuoteChar,
    pub semicolon: bool,
    pub space_around_braces: bool,
}

impl Default for ImportStyle {
    fn default() -> Self {
        Self {
            quote: QuoteChar::Single,
            semicolon: false,
            space_around_braces: false,
        }
    }
}

/// Layered settings
#[derive(Debug, Clone)]
pub struct Settings {
    values: toml::Table,
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Settings {
    /// Built-in defaults only
    pub fn defaults() -> Self {
        let values = toml::from_str::<toml::Table>(DEFAULT_SETTINGS).unwrap_or_default();
        Self { values }
    }

    /// Load defaults, user config and the project file under `project_root`
    ///
    /// Missing or malformed files are skipped with a warning.
    pub fn load(project_root: Option<&Path>) -> Self {
        let mut files = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            files.push(config_dir.join("import-helper").join("config.toml"));
        }
        if let Some(root) = project_root {
            files.push(root.join(PROJECT_CONFIG_FILE));
        }
        Self::load_files(&files)
    }

    /// Load defaults and then each existing file in order
    pub fn load_files(files: &[PathBuf]) -> Self {
        let mut settings = Self::defaults();

        for file in files {
            if !file.is_file() {
                log::debug!("No settings file at {}", file.display());
                continue;
            }

            match read_table(file) {
                Ok(table) => {
                    log::debug!("Loaded settings from {}", file.display());
                    merge_tables(&mut settings.values, table);
                }
                Err(e) => {
                    log::warn!("Ignoring settings file {}: {:#}", file.display(), e);
                }
            }
        }

        settings
    }

    /// Defaults overlaid with a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).context("Failed to parse settings")?;
        let mut settings = Self::defaults();
        merge_tables(&mut settings.values, table);
        Ok(settings)
    }

    /// Look up a setting, returning `default` for unknown keys or mistyped values
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.values.get(key) {
            Some(value) => match value.clone().try_into::<T>() {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("Setting '{}' has an unexpected type ({}), using default", key, e);
                    default
                }
            },
            None => default,
        }
    }

    /// Raw value, if set
    pub fn get_value(&self, key: &str) -> Option<&toml::Value> {
        self.values.get(key)
    }

    /// Style for newly created statements
    pub fn style(&self) -> ImportStyle {
        let defaults = ImportStyle::default();
        let quote_str: String = self.get_setting("from_quote", defaults.quote.to_string());
        let quote = QuoteChar::from_str(&quote_str).unwrap_or_else(|_| {
            log::warn!("Unknown from_quote '{}', using {}", quote_str, defaults.quote);
            defaults.quote
        });

        ImportStyle {
            quote,
            semicolon: self.get_setting("from_semicolon", defaults.semicolon),
            space_around_braces: self.get_setting("space_around_braces", defaults.space_around_braces),
        }
    }

    /// package.json tables whose dependencies are indexed
    pub fn package_keys(&self) -> Vec<String> {
        self.get_setting(
            "package_keys",
            vec!["dependencies".to_string(), "devDependencies".to_string()],
        )
    }

    /// Program and leading arguments of the entry-point resolver
    pub fn resolver_command(&self) -> Vec<String> {
        let raw: String = self.get_setting("resolver_command", "node".to_string());
        match shell_words::split(&raw) {
            Ok(words) if !words.is_empty() => words,
            Ok(_) => vec!["node".to_string()],
            Err(e) => {
                log::warn!("Invalid resolver_command '{}': {}, using node", raw, e);
                vec!["node".to_string()]
            }
        }
    }

    pub fn resolver_timeout(&self) -> Duration {
        let ms: u64 = self.get_setting("resolver_timeout_ms", 5000);
        Duration::from_millis(ms)
    }

    /// Exclusion patterns keyed by project folder; relative folders resolve against `base`
    pub fn exclusions(&self, base: &Path) -> ExclusionConfig {
        let mut config = ExclusionConfig::default();
        if let Some(value) = self.values.get("exclude") {
            config.extend(ExclusionConfig::from_value(value, base));
        }
        if let Some(value) = self.values.get("folders") {
            config.extend(ExclusionConfig::from_folders_value(value, base));
        }
        config
    }

    /// Explicit `[[typescript_paths]]` alias rules; relative base dirs resolve against `base`
    pub fn alias_rules(&self, base: &Path) -> Vec<AliasRule> {
        #[derive(Deserialize)]
        struct RawRule {
            path_to: String,
            path_value: String,
            base_dir: Option<PathBuf>,
        }

        let raw: Vec<RawRule> = self.get_setting("typescript_paths", Vec::new());
        raw.into_iter()
            .map(|rule| AliasRule {
                path_to: rule.path_to,
                path_value: rule.path_value,
                base_dir: match rule.base_dir {
                    Some(dir) if dir.is_absolute() => dir,
                    Some(dir) => lexical_normalize(&base.join(dir)),
                    None => base.to_path_buf(),
                },
            })
            .collect()
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Overlay `overlay` onto `base`, merging nested tables key by key
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Exclusion patterns per project folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionConfig {
    folders: HashMap<PathBuf, Vec<String>>,
}

impl ExclusionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "<folder>" = ["pattern", ...] }`; anything else yields no exclusions
    pub fn from_value(value: &toml::Value, base: &Path) -> Self {
        let mut config = Self::default();
        let Some(table) = value.as_table() else {
            log::warn!("Ignoring exclude settings: expected a table of folder = [patterns]");
            return config;
        };

        for (folder, patterns) in table {
            let patterns = string_list(patterns);
            if !patterns.is_empty() {
                config.insert(base.join(folder), patterns);
            }
        }

        config
    }

    /// Parse `folders = [{ path, exclude_patterns, folder_exclude_patterns, file_exclude_patterns }]`
    pub fn from_folders_value(value: &toml::Value, base: &Path) -> Self {
        let mut config = Self::default();
        let Some(folders) = value.as_array() else {
            return config;
        };

        for folder in folders {
            let Some(path) = folder.get("path").and_then(|p| p.as_str()) else {
                continue;
            };

            let mut patterns = Vec::new();
            for key in ["exclude_patterns", "folder_exclude_patterns", "file_exclude_patterns"] {
                if let Some(list) = folder.get(key) {
                    patterns.extend(string_list(list));
                }
            }

            if !patterns.is_empty() {
                config.insert(base.join(path), patterns);
            }
        }

        config
    }

    pub fn insert(&mut self, folder: impl AsRef<Path>, patterns: Vec<String>) {
        let key = lexical_normalize(folder.as_ref());
        self.folders.entry(key).or_default().extend(patterns);
    }

    pub fn extend(&mut self, other: ExclusionConfig) {
        for (folder, patterns) in other.folders {
            self.insert(folder, patterns);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Patterns configured for `root` or any folder containing it
    pub fn patterns_for(&self, root: &Path) -> Vec<String> {
        let root = lexical_normalize(root);
        let mut patterns = Vec::new();
        for (folder, list) in &self.folders {
            if root.starts_with(folder) {
                patterns.extend(list.iter().cloned());
            }
        }
        patterns
    }

    pub fn matcher_for(&self, root: &Path) -> ExclusionMatcher {
        ExclusionMatcher::new(&self.patterns_for(root))
    }
}

fn string_list(value: &toml::Value) -> Vec<String> {
    match value.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(|s| s.to_string()))
            .collect(),
        None => Vec::new(),
    }
}
