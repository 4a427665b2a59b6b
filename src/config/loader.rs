use super::{default_config_path, SupervisorConfig};
use crate::error::{ErrorCode, Result, SupervisorError};
use std::path::Path;
use tokio::fs;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one the per-user config file is
    /// read when present, otherwise defaults are used. Environment overrides
    /// are applied last in both cases.
    pub async fn load(path: Option<&Path>) -> Result<SupervisorConfig> {
        let mut config = match path {
            Some(path) => Self::load_file(path).await?,
            None => match default_config_path() {
                Some(default) if default.exists() => Self::load_file(&default).await?,
                _ => SupervisorConfig::default(),
            },
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub async fn load_file(path: &Path) -> Result<SupervisorConfig> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            SupervisorError::config_with_code(
                ErrorCode::SETUP_IO_ERROR,
                format!("Cannot read {}", path.display()),
            )
            .with_source(e)
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<SupervisorConfig> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_dir = \"/srv/yt\"\nffmpeg = \"/usr/bin/ffmpeg\"\n").unwrap();

        let config = ConfigLoader::load_file(&path).await.unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/srv/yt"));
        assert_eq!(config.ffmpeg, Some(PathBuf::from("/usr/bin/ffmpeg")));
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/ytdlp-supervisor.toml")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SETUP_IO_ERROR);
    }

    #[test]
    fn test_parse_error_has_parse_code() {
        let err = ConfigLoader::parse("poll_interval_ms = \"fast\"").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    }
}
