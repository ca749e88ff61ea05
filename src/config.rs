//! Runtime configuration

use std::path::PathBuf;

use directories::BaseDirs;

use crate::types::{Result, SalescastError};

/// Environment variable naming the database file
pub const DB_ENV: &str = "SALESCAST_DB";

const DATA_DIR: &str = ".salescast";
const DB_FILE: &str = "sales.db";

/// Resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Build from an explicit database path (flag or `SALESCAST_DB`),
    /// falling back to `~/.salescast/sales.db`
    pub fn resolve(db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => default_db_path()?,
        };
        log::debug!("using database {}", db_path.display());
        Ok(Self { db_path })
    }
}

/// `~/.salescast/sales.db`
pub fn default_db_path() -> Result<PathBuf> {
    let base = BaseDirs::new()
        .ok_or_else(|| SalescastError::Config("cannot determine home directory".into()))?;
    Ok(base.home_dir().join(DATA_DIR).join(DB_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_explicit_path() {
        let config = Config::resolve(Some(PathBuf::from("/tmp/shop.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/shop.db"));
    }

    #[test]
    fn test_resolve_default_path() {
        let config = Config::resolve(None).unwrap();
        assert!(config.db_path.ends_with(".salescast/sales.db"));
    }

    #[test]
    fn test_resolve_empty_path_uses_default() {
        let config = Config::resolve(Some(PathBuf::new())).unwrap();
        assert_eq!(config.db_path, default_db_path().unwrap());
    }
}
