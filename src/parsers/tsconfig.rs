//! TypeScript configuration file parser
//!
//! Parses tsconfig.json/jsconfig.json files to extract path alias rules from
//! compilerOptions.paths. Rules keep the order they are written in, since the
//! alias resolver breaks specificity ties by configuration order.
//!
//! Example tsconfig.json:
//! ```json
//! {
//!   "compilerOptions": {
//!     "baseUrl": ".",
//!     "paths": {
//!       "@Libs/*": ["./src/lib/*"],
//!       "@components": ["./src/app/components"]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::AliasRule;
use crate::paths::lexical_normalize;

/// Config file names probed in each directory, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Path alias mapping from one tsconfig.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathAliasMap {
    /// Alias pattern to target paths, in file order
    /// Example: "@Libs/*" => ["./src/lib/*"]
    pub aliases: Vec<(String, Vec<String>)>,
    /// Base URL for resolving relative paths
    pub base_url: Option<String>,
    /// Directory containing the config file
    pub config_dir: PathBuf,
}

/// `paths` object deserialized without losing key order
#[derive(Debug, Default)]
struct OrderedPaths(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for OrderedPaths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PathsVisitor;

        impl<'de> Visitor<'de> for PathsVisitor {
            type Value = OrderedPaths;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of alias patterns to target path lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((key, value));
                }
                Ok(OrderedPaths(entries))
            }
        }

        deserializer.deserialize_map(PathsVisitor)
    }
}

/// TypeScript compiler options (subset)
#[derive(Debug, Deserialize)]
struct CompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    paths: Option<OrderedPaths>,
}

/// TypeScript configuration file structure (subset)
#[derive(Debug, Deserialize)]
struct TsConfig {
    #[serde(rename = "compilerOptions")]
    compiler_options: Option<CompilerOptions>,
}

impl PathAliasMap {
    /// Parse a tsconfig.json file and extract path aliases
    pub fn from_file(tsconfig_path: impl AsRef<Path>) -> Result<Self> {
        let tsconfig_path = tsconfig_path.as_ref();
        let content = std::fs::read_to_string(tsconfig_path)
            .with_context(|| format!("Failed to read {}", tsconfig_path.display()))?;

        let config_dir = tsconfig_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Invalid tsconfig path: {}", tsconfig_path.display()))?
            .to_path_buf();

        Self::from_str_in(&content, config_dir)
            .with_context(|| format!("Failed to parse {}", tsconfig_path.display()))
    }

    /// Parse config text as if it lived in `config_dir`
    pub fn from_str_in(content: &str, config_dir: PathBuf) -> Result<Self> {
        // JSON5: tsconfig.json allows comments and trailing commas
        let config: TsConfig = json5::from_str(content).context("Invalid tsconfig JSON")?;

        let (base_url, paths) = match config.compiler_options {
            Some(options) => (options.base_url, options.paths.unwrap_or_default()),
            None => (None, OrderedPaths::default()),
        };

        Ok(Self {
            aliases: paths.0,
            base_url,
            config_dir,
        })
    }

    /// Find the nearest tsconfig.json or jsconfig.json at or above `start`
    pub fn find_nearest_tsconfig(start: &Path) -> Option<PathBuf> {
        let mut current_dir = if start.is_dir() { start } else { start.parent()? };

        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = current_dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }

            current_dir = current_dir.parent()?;
        }
    }

    /// Directory alias targets are relative to (config dir + baseUrl)
    pub fn base_dir(&self) -> PathBuf {
        match &self.base_url {
            Some(base_url) => lexical_normalize(&self.config_dir.join(base_url)),
            None => self.config_dir.clone(),
        }
    }

    /// Alias rules, one per pattern, using the first target of each
    pub fn to_alias_rules(&self) -> Vec<AliasRule> {
        let base_dir = self.base_dir();

        self.aliases
            .iter()
            .filter_map(|(alias, targets)| {
                let target = targets.first()?;
                Some(AliasRule {
                    path_to: alias.clone(),
                    path_value: target.clone(),
                    base_dir: base_dir.clone(),
                })
            })
            .collect()
    }
}

/// Alias rules from the nearest config file above `project_root`
///
/// A missing or malformed config yields no rules.
pub fn load_alias_rules(project_root: &Path) -> Vec<AliasRule> {
    let Some(config_path) = PathAliasMap::find_nearest_tsconfig(project_root) else {
        log::debug!("No tsconfig.json/jsconfig.json above {}", project_root.display());
        return Vec::new();
    };

    match PathAliasMap::from_file(&config_path) {
        Ok(alias_map) => {
            let rules = alias_map.to_alias_rules();
            log::debug!("Loaded {} alias rules from {}", rules.len(), config_path.display());
            rules
        }
        Err(e) => {
            log::warn!("Ignoring {}: {:#}", config_path.display(), e);
            Vec::new()
        }
    }
}
