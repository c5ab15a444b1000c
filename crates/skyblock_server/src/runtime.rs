//! The server main loop.
//!
//! One task owns the [`Skyblock`] value. Everything else reaches it through a
//! [`RuntimeHandle`], which queues closures that run on that task between
//! ticks. The loop multiplexes four things:
//!
//! - the tick interval, which advances the world cleanup queue
//! - queued commands from handles
//! - the autosave interval, which snapshots state and writes it in the background
//! - the shutdown future, after which a final save is awaited

use crate::config::AppConfig;
use anyhow::{anyhow, Context};
use skyblock_grid::{ChunkJob, ChunkRegenerator, GridStorage, JsonGridStorage, PlayerDirectory, Skyblock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A unit of work queued for the owning task.
pub type RuntimeCommand = Box<dyn FnOnce(&mut Skyblock) + Send>;

/// Cloneable access to a running [`SkyblockRuntime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    commands: mpsc::UnboundedSender<RuntimeCommand>,
}

impl RuntimeHandle {
    /// Runs `f` against the island world on the owning task and returns its result.
    pub async fn call<F, R>(&self, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut Skyblock) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, answer) = oneshot::channel();
        let command: RuntimeCommand = Box::new(move |skyblock| {
            let _ = reply.send(f(skyblock));
        });
        self.commands
            .send(command)
            .map_err(|_| anyhow!("skyblock runtime has stopped"))?;
        answer
            .await
            .map_err(|_| anyhow!("skyblock runtime stopped before answering"))
    }
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub chunks_cleaned: u64,
    pub commands: u64,
    pub autosaves: u64,
}

/// Chunk regenerator for running without an attached world.
#[derive(Debug, Default)]
pub struct LogOnlyRegenerator;

impl ChunkRegenerator for LogOnlyRegenerator {
    fn apply(&mut self, job: &ChunkJob) -> Result<(), String> {
        debug!(
            "Would clean chunk {}:{} in {} ({:?})",
            job.chunk.x, job.chunk.z, job.world, job.action
        );
        Ok(())
    }
}

/// Owns the island world and drives it.
pub struct SkyblockRuntime {
    skyblock: Skyblock,
    storage: Arc<dyn GridStorage>,
    regenerator: Box<dyn ChunkRegenerator + Send>,
    tick_interval: Duration,
    autosave_interval: Option<Duration>,
    commands: mpsc::UnboundedReceiver<RuntimeCommand>,
    handle: RuntimeHandle,
    stats: RuntimeStats,
}

impl SkyblockRuntime {
    pub fn new(
        skyblock: Skyblock,
        storage: Arc<dyn GridStorage>,
        regenerator: Box<dyn ChunkRegenerator + Send>,
        tick_interval: Duration,
        autosave_interval: Option<Duration>,
    ) -> Self {
        let (sender, commands) = mpsc::unbounded_channel();
        Self {
            skyblock,
            storage,
            regenerator,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            autosave_interval,
            commands,
            handle: RuntimeHandle { commands: sender },
            stats: RuntimeStats::default(),
        }
    }

    /// Loads the island world from the configured data directory.
    pub async fn from_config(
        config: &AppConfig,
        directory: Box<dyn PlayerDirectory>,
        regenerator: Box<dyn ChunkRegenerator + Send>,
    ) -> anyhow::Result<Self> {
        let storage = Arc::new(JsonGridStorage::new(config.storage.data_dir.clone()));
        let (skyblock, report) = Skyblock::load(
            config.grid.clone(),
            config.coop.clone(),
            directory,
            storage.as_ref(),
        )
        .await
        .context("Failed to load the island world")?;

        if report.skipped > 0 || report.conflicts > 0 {
            warn!(
                "⚠️ {} island records were unreadable and {} overlapped another island",
                report.skipped, report.conflicts
            );
        }
        info!(
            "🏝️ Island world '{}' ready with {} islands",
            config.grid.world,
            skyblock.grid().len()
        );

        Ok(Self::new(
            skyblock,
            storage,
            regenerator,
            config.tick_interval(),
            config.autosave_interval(),
        ))
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn skyblock(&self) -> &Skyblock {
        &self.skyblock
    }

    /// Runs until `shutdown` completes, then saves and hands back the world.
    ///
    /// Background save failures are logged and retried next period. A failed
    /// final save is returned as an error.
    pub async fn run<F>(mut self, shutdown: F) -> anyhow::Result<Skyblock>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let autosave_period = self.autosave_interval.unwrap_or(Duration::from_secs(3600));
        let mut autosave = interval_at(Instant::now() + autosave_period, autosave_period);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let autosave_enabled = self.autosave_interval.is_some();

        let mut in_flight: Option<JoinHandle<()>> = None;
        tokio::pin!(shutdown);

        info!(
            "🌟 Skyblock runtime started (tick {:?}, autosave {:?})",
            self.tick_interval, self.autosave_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.stats.ticks += 1;
                    let cleaned = self.skyblock.tick(&mut *self.regenerator);
                    self.stats.chunks_cleaned += cleaned as u64;
                }
                Some(command) = self.commands.recv() => {
                    self.stats.commands += 1;
                    command(&mut self.skyblock);
                }
                _ = autosave.tick(), if autosave_enabled => {
                    if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
                        debug!("Previous save still running, skipping this autosave");
                    } else {
                        in_flight = Some(self.spawn_save());
                        self.stats.autosaves += 1;
                    }
                }
            }
        }

        info!("🛑 Shutdown requested, saving the island world...");
        if let Some(task) = in_flight.take() {
            if let Err(e) = task.await {
                warn!("⚠️ Background save task ended abnormally: {}", e);
            }
        }

        self.skyblock
            .snapshot()
            .write(self.storage.as_ref())
            .await
            .context("Final save failed")?;

        let stats = self.stats;
        info!(
            "✅ Saved {} islands. {} ticks, {} chunks cleaned, {} commands, {} autosaves",
            self.skyblock.grid().len(),
            stats.ticks,
            stats.chunks_cleaned,
            stats.commands,
            stats.autosaves
        );
        Ok(self.skyblock)
    }

    fn spawn_save(&self) -> JoinHandle<()> {
        let snapshot = self.skyblock.snapshot();
        let storage = Arc::clone(&self.storage);
        tokio::spawn(async move {
            match snapshot.write(storage.as_ref()).await {
                Ok(()) => debug!("Autosave complete"),
                Err(e) => error!("❌ Autosave failed, retrying next period: {}", e),
            }
        })
    }
}
