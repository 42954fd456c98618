use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CliGuiError, Result},
    form::Geometry,
    mirror::DEFAULT_MAX_OUTPUT_LINES,
};

const CONFIG_VERSION_V1: u32 = 1;
const DEFAULT_WINDOW_TITLE: &str = "cligui";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".cligui.toml";
/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "CLIGUI_CONFIG";

/// Source used to select the effective config file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigSource {
    /// Selected via `--config`.
    Flag,
    /// Selected via `CLIGUI_CONFIG`.
    Env,
    /// Found by walking from the current directory to the root.
    Discovered,
    /// No config file selected.
    None,
}

/// Resolved config selection before parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSelection {
    /// Source used for selection.
    pub source: ConfigSource,
    /// Selected path when a config file was found.
    pub path: Option<PathBuf>,
}

/// Raw TOML shape of `.cligui.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CliGuiConfigFile {
    /// Schema version.
    pub version: u32,
    /// Window defaults.
    #[serde(default)]
    pub window: WindowConfigFile,
    /// Output region defaults.
    #[serde(default)]
    pub output: OutputConfigFile,
    /// Log sink.
    #[serde(default)]
    pub log: LogConfigFile,
}

/// Raw `[window]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WindowConfigFile {
    /// Title override.
    pub title: Option<String>,
    /// Width in columns.
    pub width: Option<u16>,
    /// Height in rows.
    pub height: Option<u16>,
    /// Column offset.
    pub x: Option<u16>,
    /// Row offset.
    pub y: Option<u16>,
}

/// Raw `[output]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfigFile {
    /// Retained line count.
    pub max_lines: Option<usize>,
}

/// Raw `[log]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LogConfigFile {
    /// Log file, relative to the config file's directory.
    pub file: Option<String>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Effective, validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliGuiConfig {
    /// File the config came from, if any.
    pub source_path: Option<PathBuf>,
    /// Title used when the schema names no program.
    pub window_title: String,
    /// Window geometry.
    pub geometry: Geometry,
    /// Output region line retention.
    pub max_output_lines: usize,
    /// Resolved log file.
    pub log_file: Option<PathBuf>,
    /// Default log filter.
    pub log_filter: Option<String>,
}

impl Default for CliGuiConfig {
    fn default() -> Self {
        Self {
            source_path: None,
            window_title: DEFAULT_WINDOW_TITLE.to_owned(),
            geometry: Geometry::default(),
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            log_file: None,
            log_filter: None,
        }
    }
}

impl CliGuiConfig {
    /// Loads and validates a config file from disk.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let absolute_path = absolutize_path(path.as_ref(), &cwd);
        if !absolute_path.exists() {
            return Err(CliGuiError::Config(format!(
                "config file does not exist: {}",
                absolute_path.display()
            )));
        }
        let raw = fs::read_to_string(&absolute_path)?;
        Self::parse_from_str(&raw, &absolute_path)
    }

    /// Parses and validates config from TOML text.
    pub fn parse_from_str(raw: &str, source_path: impl AsRef<Path>) -> Result<Self> {
        let parsed = toml::from_str::<CliGuiConfigFile>(raw)?;
        build_config(parsed, source_path.as_ref())
    }

    /// Loads the file named by `selection`, or defaults when none was selected.
    pub fn load_selected(selection: &ConfigSelection) -> Result<Self> {
        match selection.path.as_deref() {
            Some(path) => {
                tracing::debug!(source = ?selection.source, path = %path.display(), "loading config");
                Self::load_from_path(path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Resolves one config path based on precedence rules.
pub fn resolve_config_path(
    explicit_path: Option<&Path>,
    env_path: Option<&str>,
    no_config: bool,
    cwd: impl AsRef<Path>,
) -> Result<ConfigSelection> {
    if no_config {
        return Ok(ConfigSelection {
            source: ConfigSource::None,
            path: None,
        });
    }

    let cwd = cwd.as_ref();
    if let Some(path) = explicit_path {
        return Ok(ConfigSelection {
            source: ConfigSource::Flag,
            path: Some(regular_file_candidate(path, cwd)?),
        });
    }

    if let Some(value) = env_path {
        if value.trim().is_empty() {
            return Err(CliGuiError::Config(format!(
                "{CONFIG_ENV_VAR} cannot be empty"
            )));
        }
        return Ok(ConfigSelection {
            source: ConfigSource::Env,
            path: Some(regular_file_candidate(Path::new(value), cwd)?),
        });
    }

    if let Some(discovered) = discover_config(cwd) {
        return Ok(ConfigSelection {
            source: ConfigSource::Discovered,
            path: Some(discovered),
        });
    }

    Ok(ConfigSelection {
        source: ConfigSource::None,
        path: None,
    })
}

/// Discovers `.cligui.toml` by walking from `start_dir` to the filesystem root.
pub fn discover_config(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if is_regular_config_candidate(&candidate) {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

fn regular_file_candidate(path: &Path, cwd: &Path) -> Result<PathBuf> {
    let candidate = absolutize_path(path, cwd);
    if !is_regular_config_candidate(&candidate) {
        return Err(CliGuiError::Config(format!(
            "config file must be a regular file: {}",
            candidate.display()
        )));
    }
    Ok(candidate)
}

fn build_config(raw: CliGuiConfigFile, source_path: &Path) -> Result<CliGuiConfig> {
    validate_raw_config(&raw)?;

    let source_path = absolutize_path(source_path, &std::env::current_dir()?);
    let source_dir = source_path.parent().unwrap_or(Path::new("."));
    let defaults = Geometry::default();
    let geometry = Geometry {
        width: raw.window.width.unwrap_or(defaults.width),
        height: raw.window.height.unwrap_or(defaults.height),
        x: raw.window.x.unwrap_or(defaults.x),
        y: raw.window.y.unwrap_or(defaults.y),
    };
    let log_file = raw
        .log
        .file
        .as_deref()
        .map(|value| resolve_path_value(value, source_dir))
        .transpose()?;

    Ok(CliGuiConfig {
        window_title: raw
            .window
            .title
            .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_owned()),
        geometry,
        max_output_lines: raw.output.max_lines.unwrap_or(DEFAULT_MAX_OUTPUT_LINES),
        log_file,
        log_filter: raw.log.filter,
        source_path: Some(source_path),
    })
}

fn validate_raw_config(config: &CliGuiConfigFile) -> Result<()> {
    if config.version != CONFIG_VERSION_V1 {
        return Err(CliGuiError::Config(format!(
            "unsupported config version {} (expected {})",
            config.version, CONFIG_VERSION_V1
        )));
    }
    if config.window.width == Some(0) {
        return Err(CliGuiError::Config(
            "window.width must be greater than zero".to_owned(),
        ));
    }
    if config.window.height == Some(0) {
        return Err(CliGuiError::Config(
            "window.height must be greater than zero".to_owned(),
        ));
    }
    if config.output.max_lines == Some(0) {
        return Err(CliGuiError::Config(
            "output.max_lines must be greater than zero".to_owned(),
        ));
    }
    if let Some(title) = config.window.title.as_deref() {
        validate_non_empty(title, "window.title")?;
    }
    if let Some(file) = config.log.file.as_deref() {
        validate_non_empty(file, "log.file")?;
    }
    if let Some(filter) = config.log.filter.as_deref() {
        validate_non_empty(filter, "log.filter")?;
    }
    Ok(())
}

fn validate_non_empty(value: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CliGuiError::Config(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn resolve_path_value(value: &str, source_dir: &Path) -> Result<PathBuf> {
    let expanded = expand_home(value)?;
    if expanded.is_absolute() {
        return Ok(normalize_path(&expanded));
    }
    Ok(normalize_path(&source_dir.join(expanded)))
}

fn expand_home(value: &str) -> Result<PathBuf> {
    let home = || {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| CliGuiError::Config("HOME is not set".to_owned()))
    };
    if value == "~" {
        return home();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return Ok(home()?.join(rest));
    }
    if value.starts_with('~') {
        return Err(CliGuiError::Config(
            "only '~' and '~/' home expansion are supported".to_owned(),
        ));
    }
    Ok(PathBuf::from(value))
}

fn normalize_path(path: &Path) -> PathBuf {
    let is_absolute = path.is_absolute();
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !is_absolute {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    if normalized.as_os_str().is_empty() {
        return PathBuf::from(if is_absolute { "/" } else { "." });
    }
    normalized
}

fn absolutize_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&cwd.join(path))
    }
}

fn is_regular_config_candidate(path: &Path) -> bool {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return false;
    };
    !metadata.file_type().is_symlink() && metadata.file_type().is_file()
}

#[cfg(test)]
mod unit_tests {
    use std::path::{Path, PathBuf};

    use super::{normalize_path, resolve_path_value};

    #[test]
    fn normalize_path_folds_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_log_paths_resolve_against_config_dir() {
        let resolved = resolve_path_value("logs/cligui.log", Path::new("/etc/cligui")).unwrap();
        assert_eq!(resolved, PathBuf::from("/etc/cligui/logs/cligui.log"));
    }

    #[test]
    fn unsupported_home_forms_are_rejected() {
        assert!(resolve_path_value("~other/x", Path::new("/")).is_err());
    }
}
