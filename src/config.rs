//! Filter configuration: which calls count as debug noise, which files use
//! C-style comments, and how much context survives around a change.
//!
//! A [`FilterConfig`] can be built from defaults, loaded from a TOML file, or
//! both (file values override defaults, CLI flags override the file).
//!
//! ```toml
//! call_names = ["PRINTF", "PRINTK", "LOG_DEBUG"]
//! c_like_globs = ["*.c", "*.h", "*.cpp"]
//! window = 3
//! ```

use error_set::error_set;
use serde::Deserialize;
use std::path::Path;

error_set! {
    /// Errors from loading or validating a filter configuration
    ConfigError := {
        /// The config file could not be read
        #[display("Failed to read config file '{path}': {message}")]
        Unreadable { path: String, message: String },
        /// The config file is not valid TOML for [`FilterConfig`]
        #[display("Failed to parse config file '{path}': {message}")]
        Malformed { path: String, message: String },
        /// No debug call names were configured
        #[display("At least one debug call name is required")]
        NoCallNames,
        /// A call name is not a plain identifier
        #[display("Invalid debug call name '{name}': expected an identifier")]
        InvalidCallName { name: String },
        /// A file-kind glob failed to compile
        #[display("Invalid file pattern '{pattern}': {message}")]
        InvalidGlob { pattern: String, message: String },
        /// A classification pattern failed to compile
        #[display("Invalid rule pattern '{pattern}': {message}")]
        InvalidPattern { pattern: String, message: String },
    }
}

/// Tracing/print call names stripped by default.
pub const DEFAULT_CALL_NAMES: &[&str] = &[
    "PRINT",
    "FPRINTF",
    "FPRINTF_COND",
    "PRINTK",
    "STACK_TRACE",
    "PRINTF",
    "PRINTF_COND",
    "PRINTK_STUB",
    "PRINTK_COND",
    "DUMP_STACK",
    "DUMP_STACK_COND",
    "LPRINTK",
];

/// File name patterns that select C-style (`//`, `/* */`) comments.
pub const DEFAULT_C_LIKE_GLOBS: &[&str] = &[
    "*.c", "*.cc", "*.cpp", "*.cxx", "*.c++", "*.h", "*.hh", "*.hpp", "*.hxx", "*.h++", "*.i",
    "*.ii", "*.inl", "*.ipp", "*.t", "*.tcc", "*.tpp", "*.txx",
];

/// Context lines kept on each side of a retained change.
pub const DEFAULT_WINDOW: usize = 3;

/// Options controlling what the filter treats as noise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Debug/trace call names (case-sensitive)
    pub call_names: Vec<String>,
    /// Globs matched against a file's path to select C-style comments
    pub c_like_globs: Vec<String>,
    /// Context window kept around retained changes
    pub window: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            call_names: DEFAULT_CALL_NAMES.iter().map(|s| s.to_string()).collect(),
            c_like_globs: DEFAULT_C_LIKE_GLOBS.iter().map(|s| s.to_string()).collect(),
            window: DEFAULT_WINDOW,
        }
    }
}

impl FilterConfig {
    /// Load a config from a TOML file. Missing keys keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Malformed { message, .. } => ConfigError::Malformed {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: FilterConfig = toml::from_str(text).map_err(|e| ConfigError::Malformed {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check call names are usable identifiers.
    ///
    /// Globs are checked when the rule set is compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_names.is_empty() {
            return Err(ConfigError::NoCallNames);
        }

        for name in &self.call_names {
            let mut chars = name.chars();
            let valid = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(ConfigError::InvalidCallName { name: name.clone() });
            }
        }

        Ok(())
    }
}
