use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use mirror_core::{types::check_disjoint, SyncConfig};
use mirror_sync::{
    log::messages, RetryPolicy, SyncError, SyncLog, SyncReport, TreeSynchronizer,
};

use crate::error::{io_err, DaemonError};
use crate::file_log::FileLog;
use crate::log_rotation::LogRotation;

const OP_SERVICE: &str = "service";

/// Pass counters for one service lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceSummary {
    pub passes: usize,
    pub failed_passes: usize,
}

/// A validated source/replica pair plus its log, ready to run passes.
pub struct SyncService {
    config: SyncConfig,
    log: Arc<FileLog>,
    rotation: LogRotation,
    synchronizer: TreeSynchronizer,
}

impl SyncService {
    /// Validate `config` and prepare the replica root and log file.
    ///
    /// A missing source root is a startup error, not a pass failure.
    pub fn new(config: SyncConfig, dry_run: bool) -> Result<Self, DaemonError> {
        config.validate()?;
        if !config.source_path.is_dir() {
            return Err(DaemonError::SourceNotFound {
                path: config.source_path.clone(),
            });
        }
        check_disjoint(
            &resolve(&config.source_path)?,
            &resolve(&config.replica_path)?,
        )?;
        if !dry_run {
            fs::create_dir_all(&config.replica_path)
                .map_err(|e| io_err(&config.replica_path, e))?;
        }

        let log = Arc::new(FileLog::new(&config.log_file_path)?);
        let synchronizer = TreeSynchronizer::new(
            &config.source_path,
            &config.replica_path,
            log.clone(),
        )?
        .with_retry_policy(RetryPolicy::new(
            config.retry_attempts,
            config.retry_base_delay(),
        ))
        .dry_run(dry_run);

        Ok(Self {
            config,
            log,
            rotation: LogRotation::default(),
            synchronizer,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn log(&self) -> &FileLog {
        &self.log
    }

    /// One blocking pass, after rotating an oversized log.
    pub fn run_once(&self) -> Result<SyncReport, SyncError> {
        self.rotation.rotate_quietly(self.log.path());
        self.synchronizer.run()
    }

    /// Run a pass, wait one interval, repeat until `shutdown` fires.
    ///
    /// Shutdown interrupts only the wait: a pass in progress always finishes.
    /// Failed passes are logged and the loop carries on.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ServiceSummary, DaemonError> {
        let mut summary = ServiceSummary::default();
        loop {
            let service = Arc::clone(&self);
            let result = tokio::task::spawn_blocking(move || service.run_once())
                .await
                .map_err(|err| DaemonError::Join(err.to_string()))?;

            summary.passes += 1;
            match result {
                Ok(report) => tracing::info!(
                    copied = report.copied(),
                    deleted = report.deleted(),
                    unchanged = report.unchanged(),
                    failed = report.failed(),
                    "pass finished"
                ),
                Err(err) => {
                    summary.failed_passes += 1;
                    self.log
                        .error(OP_SERVICE, &messages::fatal_sync_error(&err), Some(&err));
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    self.log.info(OP_SERVICE, messages::SYNC_STOPPED_BY_USER);
                    break;
                }
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }
        Ok(summary)
    }
}

/// Absolute form of `path` with symlinks resolved in the part that exists.
fn resolve(path: &Path) -> Result<PathBuf, DaemonError> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(base) => {
                return Ok(missing.iter().rev().fold(base, |acc, part| acc.join(part)));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let (Some(parent), Some(name)) = (existing.parent(), existing.file_name()) else {
                    return Err(io_err(path, err));
                };
                missing.push(name.to_os_string());
                existing = if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                };
            }
            Err(err) => return Err(io_err(path, err)),
        }
    }
}

/// Run the periodic service on a fresh runtime until Ctrl+C.
pub fn start_blocking(config: SyncConfig, dry_run: bool) -> Result<ServiceSummary, DaemonError> {
    init_tracing();
    let service = Arc::new(SyncService::new(config, dry_run)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received ctrl-c, stopping after the current pass"),
                Err(err) => tracing::error!(error = %err, "ctrl-c handler failed"),
            }
            let _ = shutdown_tx.send(());
        });

        let summary = service.run(shutdown_rx).await;
        signal_handle.abort();
        summary
    })
}

/// Run exactly one pass without a runtime.
pub fn run_once_blocking(config: SyncConfig, dry_run: bool) -> Result<SyncReport, DaemonError> {
    init_tracing();
    let service = SyncService::new(config, dry_run)?;
    Ok(service.run_once()?)
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::ConfigError;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(tmp: &TempDir, interval: u64) -> SyncConfig {
        let mut config = SyncConfig::new(
            tmp.path().join("source"),
            tmp.path().join("replica"),
            interval,
            tmp.path().join("logs").join("sync.log"),
        );
        config.retry_base_delay_ms = 1;
        config
    }

    fn read_log(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn new_rejects_missing_source() {
        let tmp = TempDir::new().unwrap();
        let err = SyncService::new(config(&tmp, 10), false)
            .err()
            .expect("missing source must fail");
        assert!(matches!(err, DaemonError::SourceNotFound { .. }), "got: {err}");
        assert!(err.to_string().starts_with("Directory not found"));
    }

    #[test]
    fn new_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        let err = SyncService::new(config(&tmp, 0), false)
            .err()
            .expect("zero interval must fail");
        assert!(matches!(err, DaemonError::Config(_)), "got: {err}");
    }

    #[test]
    fn new_rejects_replica_inside_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        let mut config = config(&tmp, 10);
        config.replica_path = source.join("mirror");

        let err = SyncService::new(config, false)
            .err()
            .expect("nested replica must fail");
        assert!(
            matches!(err, DaemonError::Config(ConfigError::OverlappingPaths { .. })),
            "got: {err}"
        );
        assert!(!source.join("mirror").exists());
    }

    #[test]
    #[cfg(unix)]
    fn new_rejects_replica_reached_through_symlink() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        std::os::unix::fs::symlink(&source, tmp.path().join("alias")).unwrap();
        let mut config = config(&tmp, 10);
        config.replica_path = tmp.path().join("alias").join("mirror");

        let err = SyncService::new(config, true)
            .err()
            .expect("aliased replica must fail");
        assert!(
            matches!(err, DaemonError::Config(ConfigError::OverlappingPaths { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn new_prepares_replica_and_log() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        let service = SyncService::new(config(&tmp, 10), false).unwrap();
        assert!(tmp.path().join("replica").is_dir());
        assert!(service.log().path().is_file());
    }

    #[test]
    fn dry_run_does_not_create_replica() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        fs::write(tmp.path().join("source").join("a.txt"), "a").unwrap();

        let service = SyncService::new(config(&tmp, 10), true).unwrap();
        let report = service.run_once().unwrap();
        assert!(report.dry_run);
        assert!(!tmp.path().join("replica").exists());
    }

    #[test]
    fn run_once_mirrors_and_writes_log_file() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        fs::write(tmp.path().join("source").join("a.txt"), "hello").unwrap();

        let service = SyncService::new(config(&tmp, 10), false).unwrap();
        let report = service.run_once().unwrap();

        assert_eq!(report.copied(), 1);
        assert_eq!(
            fs::read_to_string(tmp.path().join("replica").join("a.txt")).unwrap(),
            "hello"
        );
        let log = read_log(service.log().path());
        assert!(log.contains("[INFO] [run] Starting synchronization..."), "log: {log}");
        assert!(log.contains("[INFO] [copy_file] Copied: a.txt"), "log: {log}");
        assert!(log.contains("Synchronization complete."), "log: {log}");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_during_wait_stops_after_first_pass() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("source")).unwrap();
        fs::write(tmp.path().join("source").join("a.txt"), "a").unwrap();
        let service = Arc::new(SyncService::new(config(&tmp, 3600), false).unwrap());

        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();
        let summary = Arc::clone(&service).run(rx).await.unwrap();

        assert_eq!(
            summary,
            ServiceSummary {
                passes: 1,
                failed_passes: 0
            }
        );
        assert!(tmp.path().join("replica").join("a.txt").exists());
        assert!(read_log(service.log().path())
            .contains("Synchronization stopped by user request"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn failing_pass_does_not_stop_the_loop() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        let service = Arc::new(SyncService::new(config(&tmp, 1), false).unwrap());
        // Source vanishes after startup: every pass fails structurally.
        fs::remove_dir_all(&source).unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(Arc::clone(&service).run(rx));
        // Paused clock: the runtime jumps over each one-second interval.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        tx.send(()).unwrap();
        let summary = handle.await.unwrap().unwrap();

        assert!(summary.passes >= 2, "got: {summary:?}");
        assert_eq!(summary.failed_passes, summary.passes);
        let log = read_log(service.log().path());
        assert!(log.contains("[ERROR] [service] Fatal sync error"), "log: {log}");
    }
}
