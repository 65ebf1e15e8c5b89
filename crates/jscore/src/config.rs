//! Context configuration
//!
//! ```toml
//! initial_heap_size = 1048576
//! max_heap_size = 67108864
//! max_interface_depth = 32
//! ```

use std::path::Path;

use deno_core::v8;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_MAX_INTERFACE_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Initial V8 heap size in bytes
    pub initial_heap_size: Option<usize>,
    /// V8 heap limit in bytes
    pub max_heap_size: Option<usize>,
    /// How deep `Value::to_host` may recurse into nested objects
    pub max_interface_depth: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            initial_heap_size: None,
            max_heap_size: None,
            max_interface_depth: DEFAULT_MAX_INTERFACE_DEPTH,
        }
    }
}

impl ContextConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: ContextConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("loading context config from {}", path.display());
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_interface_depth == 0 {
            return Err(Error::Config("max_interface_depth must be at least 1".into()));
        }
        match (self.initial_heap_size, self.max_heap_size) {
            (Some(_), None) => Err(Error::Config(
                "initial_heap_size requires max_heap_size".into(),
            )),
            (Some(initial), Some(max)) if initial > max => Err(Error::Config(format!(
                "initial_heap_size ({}) exceeds max_heap_size ({})",
                initial, max
            ))),
            (_, Some(0)) => Err(Error::Config("max_heap_size must be non-zero".into())),
            _ => Ok(()),
        }
    }

    pub(crate) fn create_params(&self) -> Option<v8::CreateParams> {
        let max = self.max_heap_size?;
        let initial = self.initial_heap_size.unwrap_or(0);
        Some(v8::CreateParams::default().heap_limits(initial, max))
    }
}
