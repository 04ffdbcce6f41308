//! Process-wide services, owned by one explicitly passed [`AppContext`].
//!
//! The context is built once at startup: it installs logging, loads the usage
//! statistics state and hands out [`Project`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, MutexGuard};
use taproot_config::{load_for_root, ConfigError, LogBuffer, TaprootConfig};
use taproot_roots::Project;
use taproot_stats::{GroupDescriptor, StatsError, UsageDescriptor, UsageStatistics};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("statistics state: {0}")]
    Stats(#[from] StatsError),
}

#[derive(Debug)]
pub struct AppContext {
    config: TaprootConfig,
    config_path: Option<PathBuf>,
    log_buffer: Arc<LogBuffer>,
    statistics: Mutex<UsageStatistics>,
    statistics_file: PathBuf,
}

impl AppContext {
    pub fn new(config: TaprootConfig) -> Result<Self, AppError> {
        Self::build(config, None)
    }

    /// Discovers `taproot.toml` (or `$TAPROOT_CONFIG_PATH`) for `root`; defaults apply without one.
    pub fn for_root(root: &Path) -> Result<Self, AppError> {
        let (config, path) = load_for_root(root)?;
        Self::build(config, path)
    }

    fn build(config: TaprootConfig, config_path: Option<PathBuf>) -> Result<Self, AppError> {
        let log_buffer = taproot_config::init_tracing(&config.logging);
        let statistics_file = config.statistics.effective_state_file();
        let statistics = UsageStatistics::load_from_path(&statistics_file, &config.statistics)?;
        tracing::info!(
            target: "taproot.app",
            config = ?config_path,
            statistics = %statistics_file.display(),
            allowed = statistics.is_allowed(),
            "application context ready"
        );
        Ok(Self {
            config,
            config_path,
            log_buffer,
            statistics: Mutex::new(statistics),
            statistics_file,
        })
    }

    pub fn config(&self) -> &TaprootConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn log_buffer(&self) -> &Arc<LogBuffer> {
        &self.log_buffer
    }

    pub fn open_project(&self, name: &str) -> Project {
        let project = Project::new(name);
        tracing::debug!(target: "taproot.app", project = name, id = project.id().0, "opened project");
        project
    }

    pub fn statistics(&self) -> MutexGuard<'_, UsageStatistics> {
        self.statistics.lock()
    }

    pub fn statistics_file(&self) -> &Path {
        &self.statistics_file
    }

    /// Records a send of `usages` at `now_millis`. Nothing is recorded while
    /// sending is disallowed; returns whether the usages were recorded.
    pub fn record_sent(
        &self,
        usages: Vec<(GroupDescriptor, Vec<UsageDescriptor>)>,
        now_millis: i64,
    ) -> bool {
        let mut statistics = self.statistics.lock();
        if !statistics.is_allowed() {
            tracing::debug!(target: "taproot.app", "usage statistics are disallowed");
            return false;
        }
        statistics.persist_patch(usages);
        statistics.set_sent_time(now_millis);
        true
    }

    pub fn save_statistics(&self) -> Result<(), AppError> {
        self.statistics.lock().save_to_path(&self.statistics_file)?;
        Ok(())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
