//! XDG-compliant path resolution for libgen-server.
//!
//! The configuration file lives under `$XDG_CONFIG_HOME/libgen-server/`, log
//! files under `$XDG_STATE_HOME/libgen-server/logs/`.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

const APP_DIR: &str = "libgen-server";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(libgen::paths::no_home),
        help("Set the HOME environment variable or pass `--config <file>` explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(libgen::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global directories for libgen-server.
#[derive(Debug, Clone)]
pub struct LibgenPaths {
    /// `$XDG_CONFIG_HOME/libgen-server/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/libgen-server/`
    pub data_dir: PathBuf,
    /// `$XDG_STATE_HOME/libgen-server/`
    pub state_dir: PathBuf,
}

impl LibgenPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join(APP_DIR);

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join(APP_DIR);

        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/state"))
            .join(APP_DIR);

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
        })
    }

    /// Path to the server configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("libgen.toml")
    }

    /// Suggested location for a catalog created without an explicit path.
    pub fn default_database_file(&self) -> PathBuf {
        self.data_dir.join("libgen.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Log file used by `--log-file` when no path is given.
    pub fn default_log_file(&self) -> PathBuf {
        self.log_dir().join("libgen.log")
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.log_dir(),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_paths_are_app_scoped() {
        // Env vars are left alone: mutating them is unsafe in edition 2024.
        let Ok(paths) = LibgenPaths::resolve() else {
            return;
        };
        assert!(paths.config_dir.ends_with(APP_DIR));
        assert!(paths.data_dir.ends_with(APP_DIR));
        assert!(paths.config_file().starts_with(&paths.config_dir));
    }

    #[test]
    fn files_derive_from_dirs() {
        let paths = LibgenPaths {
            config_dir: PathBuf::from("/cfg/libgen-server"),
            data_dir: PathBuf::from("/data/libgen-server"),
            state_dir: PathBuf::from("/state/libgen-server"),
        };
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/cfg/libgen-server/libgen.toml")
        );
        assert_eq!(
            paths.default_database_file(),
            PathBuf::from("/data/libgen-server/libgen.redb")
        );
        assert_eq!(paths.log_dir(), PathBuf::from("/state/libgen-server/logs"));
        assert_eq!(
            paths.default_log_file(),
            PathBuf::from("/state/libgen-server/logs/libgen.log")
        );
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = LibgenPaths {
            config_dir: dir.path().join("cfg"),
            data_dir: dir.path().join("data"),
            state_dir: dir.path().join("state"),
        };
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.log_dir().is_dir());
        assert!(paths.config_dir.is_dir());
    }
}
