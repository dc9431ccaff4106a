// Configuration loading and parsing (draft.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub lookup: LookupConfig,
    pub sheet: SheetConfig,
    pub db_path: String,
    pub draft_key: String,
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    lookup: LookupConfig,
    sheet: SheetConfig,
    database: DatabaseSection,
    session: SessionSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionSection {
    draft_key: String,
}

/// Card lookup service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    pub path: String,
    /// Shown to players when the draft fires. Empty means no link.
    #[serde(default)]
    pub link: String,
}

impl SheetConfig {
    pub fn link(&self) -> Option<&str> {
        let link = self.link.trim();
        (!link.is_empty()).then_some(link)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` relative to
/// `base_dir`. Does not copy defaults; see `load_config()`.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let draft_path = base_dir.join("config").join("draft.toml");
    let draft_text = read_file(&draft_path)?;
    let file: DraftFile = toml::from_str(&draft_text).map_err(|e| ConfigError::ParseError {
        path: draft_path.clone(),
        source: e,
    })?;

    let config = Config {
        lookup: file.lookup,
        sheet: file.sheet,
        db_path: file.database.path,
        draft_key: file.session.draft_key,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/draft.toml` from `defaults/draft.toml` on first run. An
/// existing config is never touched. Returns whether a copy was made.
pub fn ensure_draft_config(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = base_dir.join("config").join("draft.toml");
    if target.exists() {
        return Ok(false);
    }

    let source = base_dir.join("defaults").join("draft.toml");
    if !source.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/draft.toml or defaults/draft.toml under {}",
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&source, &target).map_err(copy_err)?;
    Ok(true)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Seeds the config from defaults before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_draft_config(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.lookup.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "lookup.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    let timeout = config.lookup.timeout_secs;
    if !(1..=120).contains(&timeout) {
        return Err(ConfigError::ValidationError {
            field: "lookup.timeout_secs".into(),
            message: format!("must be between 1 and 120 inclusive, got {timeout}"),
        });
    }

    let required: &[(&str, &str)] = &[
        ("sheet.path", config.sheet.path.as_str()),
        ("database.path", config.db_path.as_str()),
        ("session.draft_key", config.draft_key.as_str()),
    ];
    for (name, val) in required {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the rotisserie-app crate root, which holds `defaults/`.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/rotisserie-app/defaults").exists() {
            cwd.join("crates/rotisserie-app")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Write `draft.toml` with one line of the defaults replaced.
    fn write_config(tmp: &Path, from: &str, to: &str) {
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(tmp);
        fs::create_dir_all(&config_dir).unwrap();
        let defaults = fs::read_to_string(project_root().join("defaults/draft.toml")).unwrap();
        assert!(defaults.contains(from), "defaults missing {from:?}");
        fs::write(config_dir.join("draft.toml"), defaults.replace(from, to)).unwrap();
    }

    #[test]
    fn load_defaults() {
        let tmp = std::env::temp_dir().join("rotisserie_config_defaults");
        write_config(&tmp, "draft_key", "draft_key");

        let config = load_config_from(&tmp).expect("should load default config");
        assert_eq!(config.lookup.base_url, "https://api.scryfall.com");
        assert_eq!(config.lookup.timeout_secs, 10);
        assert_eq!(config.sheet.path, "draft-sheet.csv");
        assert_eq!(config.sheet.link(), None);
        assert_eq!(config.db_path, "rotisserie.db");
        assert_eq!(config.draft_key, "default");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn sheet_link_is_optional() {
        let tmp = std::env::temp_dir().join("rotisserie_config_link");
        write_config(&tmp, "link = \"\"", "link = \"https://sheet.example/abc\"");

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.sheet.link(), Some("https://sheet.example/abc"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let tmp = std::env::temp_dir().join("rotisserie_config_zero_timeout");
        write_config(&tmp, "timeout_secs = 10", "timeout_secs = 0");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "lookup.timeout_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_draft_key() {
        let tmp = std::env::temp_dir().join("rotisserie_config_empty_key");
        write_config(&tmp, "draft_key = \"default\"", "draft_key = \"  \"");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "session.draft_key");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_base_url() {
        let tmp = std::env::temp_dir().join("rotisserie_config_empty_url");
        write_config(
            &tmp,
            "base_url = \"https://api.scryfall.com\"",
            "base_url = \"\"",
        );

        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ValidationError { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_draft_toml() {
        let tmp = std::env::temp_dir().join("rotisserie_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("draft.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = std::env::temp_dir().join("rotisserie_config_invalid");
        write_config(&tmp, "[session]", "[session");

        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeds_config_once_and_keeps_edits() {
        let tmp = std::env::temp_dir().join("rotisserie_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/draft.toml"),
            tmp.join("defaults/draft.toml"),
        )
        .unwrap();

        assert!(ensure_draft_config(&tmp).unwrap());
        assert!(load_config_from(&tmp).is_ok());

        fs::write(tmp.join("config/draft.toml"), "# custom\n").unwrap();
        assert!(!ensure_draft_config(&tmp).unwrap());
        assert_eq!(
            fs::read_to_string(tmp.join("config/draft.toml")).unwrap(),
            "# custom\n"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn seeding_without_defaults_is_an_error() {
        let tmp = std::env::temp_dir().join("rotisserie_config_no_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(matches!(
            ensure_draft_config(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));

        let _ = fs::remove_dir_all(&tmp);
    }
}
