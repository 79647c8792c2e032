use crate::runtime::config::CollectorConfig;
use crate::runtime::context::Context;
use crate::runtime::task::Task;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use crate::scheduler::Scheduler;
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Running {
    scheduler: JoinHandle<()>,
    reporter: JoinHandle<()>,
}

/// Coordinates the scheduler and metrics reporter lifecycle and handles OS
/// signals for graceful shutdowns.
pub struct Runner {
    config: CollectorConfig,
    scheduler: Scheduler,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    running: Option<Running>,
}

impl Runner {
    /// Validates the tasks against `config` and wires `telemetry` as the
    /// scheduler's failure sink. Nothing runs until [`Runner::start`].
    pub fn new<I>(config: CollectorConfig, tasks: I, telemetry: Arc<Telemetry>) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        let scheduler = Scheduler::new(tasks, config.worker_count())?
            .with_metrics(telemetry.clone());
        Ok(Self {
            config,
            scheduler,
            telemetry,
            shutdown: CancellationToken::new(),
            running: None,
        })
    }

    /// Returns a clone of the root shutdown token so external callers can integrate
    /// with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the scheduler and the metrics reporter under the root token.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let ctx = Context::from_token(self.shutdown.child_token());
        let scheduler = self.scheduler.clone();
        let scheduler = tokio::spawn(async move { scheduler.start(&ctx).await });
        let reporter = spawn_metrics_reporter(
            self.telemetry.clone(),
            self.shutdown.child_token(),
            self.config.metrics_interval(),
        );

        self.running = Some(Running {
            scheduler,
            reporter,
        });
        tracing::info!(
            workers = self.scheduler.workers(),
            tasks = self.scheduler.tasks().len(),
            "runner started"
        );
        Ok(())
    }

    /// Cancels the root token and waits for the scheduler to drain.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        self.shutdown.cancel();
        let result = join_running(running).await;
        self.reinitialize_shutdown_token();
        result
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!("runner started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down runner");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("runner shutdown token cancelled");
            }
        }

        self.stop().await
    }

    fn reinitialize_shutdown_token(&mut self) {
        self.shutdown = CancellationToken::new();
    }
}

async fn join_running(running: Running) -> Result<()> {
    let scheduler = running
        .scheduler
        .await
        .context("scheduler task terminated abnormally");
    let reporter = running
        .reporter
        .await
        .context("metrics reporter terminated abnormally");
    scheduler?;
    reporter?;
    tracing::info!("runner stopped");
    Ok(())
}
