//! Command implementations and the workspace they share.

pub mod allocate;
pub mod assemble;
pub mod character;
pub mod estimate;
pub mod index;
pub mod init;
pub mod status;
pub mod write;

use std::path::{Path, PathBuf};
use storyloom_config::AppConfig;
use storyloom_core::Budget;
use storyloom_store::ContentStore;
use tokio::io::AsyncReadExt;

/// Config, validated budget, and store for one invocation.
pub struct Workspace {
    pub config_path: PathBuf,
    pub config: AppConfig,
    pub budget: Budget,
    pub store: ContentStore,
}

impl Workspace {
    /// Load the config (with environment overrides) and open the novel
    /// directory. `dir` wins over both.
    pub fn open(
        config: Option<&Path>,
        dir: Option<&Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = config_path(config);
        let (mut config, budget) = AppConfig::load_with_env(&config_path)
            .map_err(|e| format!("Failed to load config: {e}"))?;
        if let Some(dir) = dir {
            config.novel_dir = dir.to_path_buf();
        }

        let store = ContentStore::with_layout(&config.novel_dir, config.extra_categories()?);
        tracing::debug!(
            dir = %config.novel_dir.display(),
            budget = budget.total(),
            "Workspace opened"
        );

        Ok(Self {
            config_path,
            config,
            budget,
            store,
        })
    }
}

/// `--config` when given, otherwise `~/.storyloom/config.toml`.
pub fn config_path(config: Option<&Path>) -> PathBuf {
    config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Read `file`, or all of stdin when no file is given.
pub async fn read_input(file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into()),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}
