use std::path::PathBuf;

use crate::logging;

pub const ENV_DATA_DIR: &str = "NOTENMEISTER_DATA_DIR";
pub const ENV_LOG_DIR: &str = "NOTENMEISTER_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "NOTENMEISTER_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Opened at startup when set; otherwise the front end sends `workspace.select`.
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            data_dir: non_empty(ENV_DATA_DIR).map(|v| PathBuf::from(v.trim())),
            log_dir: non_empty(ENV_LOG_DIR).map(|v| PathBuf::from(v.trim())),
            log_level: non_empty(ENV_LOG_LEVEL)
                .unwrap_or_else(|| logging::default_level().to_string()),
        }
    }

    /// Explicit log dir, else `<data dir>/logs`.
    pub fn log_dir_for(&self, data_dir: Option<&std::path::Path>) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| data_dir.map(|d| d.join("logs")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let c = config(&[]);
        assert_eq!(c.data_dir, None);
        assert_eq!(c.log_dir, None);
        assert_eq!(c.log_level, logging::default_level());
    }

    #[test]
    fn blank_values_are_ignored() {
        let c = config(&[(ENV_DATA_DIR, "  "), (ENV_LOG_LEVEL, "")]);
        assert_eq!(c.data_dir, None);
        assert_eq!(c.log_level, logging::default_level());
    }

    #[test]
    fn log_dir_falls_back_to_data_dir() {
        let c = config(&[(ENV_DATA_DIR, "/srv/noten"), (ENV_LOG_LEVEL, "warn")]);
        assert_eq!(c.data_dir.as_deref(), Some(Path::new("/srv/noten")));
        assert_eq!(c.log_level, "warn");
        assert_eq!(
            c.log_dir_for(c.data_dir.as_deref()),
            Some(PathBuf::from("/srv/noten/logs"))
        );

        let explicit = config(&[(ENV_LOG_DIR, "/var/log/noten")]);
        assert_eq!(
            explicit.log_dir_for(Some(Path::new("/srv/noten"))),
            Some(PathBuf::from("/var/log/noten"))
        );
        assert_eq!(explicit.log_dir_for(None), Some(PathBuf::from("/var/log/noten")));
    }
}
