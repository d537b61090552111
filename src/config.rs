use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
    /// Ignore SIGINT/SIGQUIT in the interpreter itself. Stages always get the defaults back.
    pub ignore_interrupts: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig { prompt: "> ".to_string(), ignore_interrupts: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Limits {
    pub max_stages: usize,
    pub max_args: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_stages: 1000, max_args: 1024 }
    }
}

/// What to do when a pipe or a child process cannot be allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourcePolicy {
    /// Terminate the interpreter.
    #[default]
    Exit,
    /// Report, clean up, and read the next line.
    AbortCommand,
}

/// What a wildcard argument becomes when nothing matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoMatchPolicy {
    /// The argument disappears from the vector.
    #[default]
    Drop,
    /// The pattern is passed through unchanged.
    Literal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Policy {
    pub resource_exhaustion: ResourcePolicy,
    pub glob_no_match: NoMatchPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Permission bits for files created by `>`, before the umask.
    pub file_mode: u32,
    pub truncate: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        RedirectConfig { file_mode: 0o666, truncate: true }
    }
}

impl Config {
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(path, &content)
    }

    /// `~/.config/smsh-rs/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/smsh-rs/config.toml"))
    }

    /// Resolution order: explicit path (must load), then the user file if it
    /// exists (parse errors fall back to defaults with a warning), then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::from_file(path)?;
            log::info!("loaded config from {}", path.display());
            return Ok(config);
        }
        let Some(path) = Self::default_path().filter(|p| p.is_file()) else {
            log::debug!("no user config, using defaults");
            return Ok(Config::default());
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                eprintln!("smsh-rs: {e}");
                log::warn!("ignoring unreadable user config, using defaults");
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Config {
        Config::from_toml(Path::new("test.toml"), s).unwrap()
    }

    #[test]
    fn empty_file_is_defaults() {
        let config = parse("");
        assert_eq!(config, Config::default());
        assert_eq!(config.shell.prompt, "> ");
        assert_eq!(config.limits.max_stages, 1000);
        assert_eq!(config.limits.max_args, 1024);
        assert_eq!(config.policy.resource_exhaustion, ResourcePolicy::Exit);
        assert_eq!(config.policy.glob_no_match, NoMatchPolicy::Drop);
        assert!(config.redirect.truncate);
    }

    #[test]
    fn example_file_matches_defaults() {
        assert_eq!(parse(include_str!("../config.example.toml")), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse(
            r#"
[limits]
max_stages = 4

[policy]
resource_exhaustion = "abort-command"
glob_no_match = "literal"

[redirect]
file_mode = 0o600
"#,
        );
        assert_eq!(config.limits.max_stages, 4);
        assert_eq!(config.limits.max_args, 1024);
        assert_eq!(config.policy.resource_exhaustion, ResourcePolicy::AbortCommand);
        assert_eq!(config.policy.glob_no_match, NoMatchPolicy::Literal);
        assert_eq!(config.redirect.file_mode, 0o600);
        assert!(config.redirect.truncate);
        assert_eq!(config.shell, ShellConfig::default());
    }

    #[test]
    fn bad_policy_is_a_parse_error() {
        let err = Config::from_toml(Path::new("x.toml"), "[policy]\nglob_no_match = \"keep\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("x.toml"));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
