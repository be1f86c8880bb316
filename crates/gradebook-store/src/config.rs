//! Gradebook configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradebook_core::engine::EngineConfig;

use crate::memory::DEFAULT_MAX_GRADE;

/// Top-level gradebook configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradebookConfig {
    /// Max students computed concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Time budget for one unit average in milliseconds.
    #[serde(default = "default_unit_timeout")]
    pub unit_timeout_ms: u64,
    /// Time budget for one student's class average in milliseconds.
    #[serde(default = "default_student_timeout")]
    pub student_timeout_ms: u64,
    /// Highest accepted grade value.
    #[serde(default = "default_max_grade")]
    pub max_grade: f64,
    /// Students listed by `top` when no count is given.
    #[serde(default = "default_top_count")]
    pub default_top_count: usize,
    /// Output directory for saved reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_parallelism() -> usize {
    4
}
fn default_unit_timeout() -> u64 {
    2000
}
fn default_student_timeout() -> u64 {
    10_000
}
fn default_max_grade() -> f64 {
    DEFAULT_MAX_GRADE
}
fn default_top_count() -> usize {
    3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./gradebook-reports")
}

impl Default for GradebookConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            unit_timeout_ms: default_unit_timeout(),
            student_timeout_ms: default_student_timeout(),
            max_grade: default_max_grade(),
            default_top_count: default_top_count(),
            output_dir: default_output_dir(),
        }
    }
}

impl GradebookConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallelism: self.parallelism,
            unit_timeout: Duration::from_millis(self.unit_timeout_ms),
            student_timeout: Duration::from_millis(self.student_timeout_ms),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            anyhow::bail!("parallelism must be at least 1");
        }
        if !(self.max_grade > 0.0 && self.max_grade.is_finite()) {
            anyhow::bail!("max_grade must be a positive number, got {}", self.max_grade);
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Replace `${NAME}` references using `lookup`. Inserted values are not
/// scanned again.
fn substitute_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut cursor = 0;
    while let Some(offset) = result[cursor..].find("${") {
        let start = cursor + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let value = lookup(&result[start + 2..start + end]).unwrap_or_default();
        result.replace_range(start..start + end + 1, &value);
        cursor = start + value.len();
    }
    result
}

/// Apply `GRADEBOOK_*` overrides, reading variables through `lookup`.
fn apply_env_overrides(
    config: &mut GradebookConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(value) = lookup("GRADEBOOK_PARALLELISM") {
        config.parallelism = value
            .trim()
            .parse()
            .with_context(|| format!("invalid GRADEBOOK_PARALLELISM: {value}"))?;
    }
    if let Some(value) = lookup("GRADEBOOK_MAX_GRADE") {
        config.max_grade = value
            .trim()
            .parse()
            .with_context(|| format!("invalid GRADEBOOK_MAX_GRADE: {value}"))?;
    }
    Ok(())
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `gradebook.toml` in the current directory
/// 2. `~/.config/gradebook/config.toml`
///
/// Environment variable overrides: `GRADEBOOK_PARALLELISM`, `GRADEBOOK_MAX_GRADE`.
pub fn load_config_from(path: Option<&Path>) -> Result<GradebookConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("gradebook.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<GradebookConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => GradebookConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.output_dir = PathBuf::from(resolve_env_vars(&config.output_dir.to_string_lossy()));
    config.validate()?;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradebook"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_GRADEBOOK_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_GRADEBOOK_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_GRADEBOOK_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_GRADEBOOK_UNSET_VAR}/x"), "/x");
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_GRADEBOOK_TEST_VAR");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let lookup = |name: &str| match name {
            "SELF" => Some("${SELF}".to_string()),
            "OTHER" => Some("${SELF}/x".to_string()),
            "ROOT" => Some("/srv".to_string()),
            _ => None,
        };
        assert_eq!(substitute_vars("${SELF}", lookup), "${SELF}");
        assert_eq!(substitute_vars("a/${OTHER}/${ROOT}", lookup), "a/${SELF}/x//srv");
        assert_eq!(substitute_vars("${ROOT}${ROOT}", lookup), "/srv/srv");
        assert_eq!(substitute_vars("${MISSING}-${ROOT}", lookup), "-/srv");
    }

    #[test]
    fn default_config() {
        let config = GradebookConfig::default();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_grade, 10.0);
        assert_eq!(config.default_top_count, 3);

        let engine = config.engine_config();
        assert_eq!(engine.unit_timeout, Duration::from_secs(2));
        assert_eq!(engine.student_timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_partial_config() {
        let config: GradebookConfig = toml::from_str(
            r#"
parallelism = 8
max_grade = 20.0
"#,
        )
        .unwrap();
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.max_grade, 20.0);
        assert_eq!(config.unit_timeout_ms, 2000);
        assert_eq!(config.output_dir, PathBuf::from("./gradebook-reports"));
    }

    #[test]
    fn env_overrides() {
        let mut config = GradebookConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            "GRADEBOOK_PARALLELISM" => Some("2".into()),
            "GRADEBOOK_MAX_GRADE" => Some(" 20 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.max_grade, 20.0);

        let err = apply_env_overrides(&mut config, |name| {
            (name == "GRADEBOOK_PARALLELISM").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("GRADEBOOK_PARALLELISM"));
    }

    #[test]
    fn explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "default_top_count = 5\nunit_timeout_ms = 50\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_top_count, 5);
        assert_eq!(config.engine_config().unit_timeout, Duration::from_millis(50));

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "parallelism = 0\n").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("parallelism"));
    }
}
