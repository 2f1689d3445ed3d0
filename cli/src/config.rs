use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use subblock::{Defines, PassContext};

/// Settings for a preprocessing run, read from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocConfig {
    /// Charset of included files. Unset means UTF-8.
    #[serde(default)]
    pub charset: Option<String>,

    /// Configuration lines handed to every pass.
    #[serde(default)]
    pub config: Vec<String>,

    /// Predefined symbols.
    #[serde(default)]
    pub defines: BTreeMap<String, String>,

    /// Directory that include paths are relative to. Relative values are
    /// taken relative to the config file.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl PreprocConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        let mut config: PreprocConfig = toml::from_str(&text)
            .map_err(|e| format!("invalid config '{}': {}", path.display(), e))?;
        if let (Some(base), Some(dir)) = (&config.base_dir, path.parent()) {
            if base.is_relative() {
                config.base_dir = Some(dir.join(base));
            }
        }
        Ok(config)
    }

    /// Apply `NAME=VALUE` (or bare `NAME`, defined as empty) overrides.
    pub fn define_all(&mut self, definitions: &[String]) {
        for definition in definitions {
            let (name, value) = definition.split_once('=').unwrap_or((definition.as_str(), ""));
            self.defines.insert(name.trim().to_string(), value.to_string());
        }
    }

    pub fn into_context(self, default_base_dir: PathBuf) -> PassContext {
        let base_dir = self.base_dir.unwrap_or(default_base_dir);
        let defines: Defines = self.defines.into_iter().collect();
        PassContext::new(base_dir)
            .with_config(self.config)
            .with_charset(self.charset)
            .with_defines(defines)
    }
}
