//! Channel manager and cooperative run loop.
//!
//! The manager owns every data channel together with its processors, command
//! scheduler and circular buffer, and drives them from one global tick. The
//! tick is the minimum of all configured periods, floored to a safety value,
//! and is recomputed whenever the registered set changes.
//!
//! One tick, in order: for each channel (configuration order), dispatch its
//! processors (registration order), then its command scheduler, push all
//! produced records into the channel's circular buffer, and — when anything
//! on the channel was ready this tick — serialize the buffer and attempt a
//! publish through the batch gate. Iteration i+1 never begins before
//! iteration i's publish attempts complete.
//!
//! Failure policy per tick: a single processor failure or publish failure is
//! logged and skipped; a command execution failure aborts the cycle and
//! propagates out of the run loop (see [`crate::error`]).

use crate::buffer::EventBuffer;
use crate::channel::DataChannel;
use crate::command::CommandScheduler;
use crate::config::Settings;
use crate::error::AppResult;
use crate::processor::{Processor, ProcessorRegistry, RegistryContext};
use crate::shutdown::ShutdownToken;
use crate::transport::Transmitter;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Safety floor for the global tick, guarding against a misconfigured zero
/// period busy-spinning the loop.
pub const MIN_TICK: Duration = Duration::from_millis(10);

/// Tick used when no periodic entity is registered at all.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

struct ManagedChannel {
    channel: DataChannel,
    buffer: EventBuffer,
    processors: Vec<Box<dyn Processor>>,
    scheduler: CommandScheduler,
}

impl std::fmt::Debug for DataChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannelManager")
            .field("channels", &self.channels.len())
            .field("global_tick", &self.global_tick)
            .finish()
    }
}

/// Owns all channels and processors and drives the per-tick publish cycle.
pub struct DataChannelManager {
    channels: Vec<ManagedChannel>,
    global_tick: Duration,
}

impl DataChannelManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            global_tick: DEFAULT_TICK,
        }
    }

    /// Build the full channel set from configuration. Processor
    /// construction failures are startup-fatal.
    pub fn from_settings(
        settings: &Settings,
        registry: &ProcessorRegistry,
        ctx: &RegistryContext,
    ) -> AppResult<Self> {
        let mut manager = Self::new();
        let capacity = settings.event_buffer.num_events_in_circular_buffer;
        for channel_settings in &settings.data_channels {
            let mut processors = Vec::with_capacity(channel_settings.processors.len());
            for processor_settings in &channel_settings.processors {
                processors.push(registry.create(processor_settings, ctx)?);
            }
            let channel = DataChannel::from_settings(channel_settings);
            channel.log_attributes();
            manager.add_channel(
                channel,
                capacity,
                processors,
                CommandScheduler::from_settings(&channel_settings.commands),
            );
        }
        Ok(manager)
    }

    /// Register one channel with its processors and command scheduler.
    /// Recomputes the global tick.
    pub fn add_channel(
        &mut self,
        channel: DataChannel,
        buffer_capacity: usize,
        processors: Vec<Box<dyn Processor>>,
        scheduler: CommandScheduler,
    ) {
        self.channels.push(ManagedChannel {
            channel,
            buffer: EventBuffer::new(buffer_capacity),
            processors,
            scheduler,
        });
        self.recompute_global_tick();
    }

    /// Number of registered channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Current global tick.
    pub fn global_tick(&self) -> Duration {
        self.global_tick
    }

    /// Recompute the cached global tick: minimum of all processor periods
    /// and command intervals, floored to [`MIN_TICK`].
    pub fn recompute_global_tick(&mut self) {
        let minimum = self
            .channels
            .iter()
            .flat_map(|managed| {
                managed
                    .processors
                    .iter()
                    .map(|processor| processor.period())
                    .chain(managed.scheduler.min_interval())
            })
            .min();
        self.global_tick = minimum.unwrap_or(DEFAULT_TICK).max(MIN_TICK);
        debug!(tick_millis = self.global_tick.as_millis() as u64, "global tick recomputed");
    }

    /// Run one dispatch cycle over all channels.
    pub fn run_tick(&mut self, transmitter: &mut dyn Transmitter) -> AppResult<()> {
        for managed in &mut self.channels {
            let mut any_ready = false;

            for processor in &mut managed.processors {
                if !processor.is_ready_to_process() {
                    continue;
                }
                any_ready = true;
                match processor.process() {
                    Ok(records) => {
                        for record in records {
                            managed.buffer.push(record);
                        }
                    }
                    Err(e) if e.is_scheduler_fatal() => return Err(e),
                    Err(e) => {
                        warn!(
                            channel = managed.channel.name(),
                            kind = processor.kind(),
                            "processor failed, skipping its output this tick: {}",
                            e
                        );
                    }
                }
            }

            if managed.scheduler.any_ready() {
                any_ready = true;
                for record in managed.scheduler.run_pass()? {
                    managed.buffer.push(record);
                }
            }

            if !any_ready {
                continue;
            }

            let payload = managed.buffer.serialize();
            if managed.channel.should_publish() {
                if let Err(e) = transmitter.publish(managed.channel.name(), &payload) {
                    warn!(
                        channel = managed.channel.name(),
                        "publish failed: {}",
                        e
                    );
                }
            } else {
                trace!(channel = managed.channel.name(), "publish suppressed by batch gate");
            }
        }
        Ok(())
    }

    /// Cooperative run loop: check the shutdown token, run one tick, sleep
    /// the global tick. A signal arriving mid-iteration takes effect at the
    /// next iteration boundary.
    pub async fn run(
        &mut self,
        transmitter: &mut dyn Transmitter,
        shutdown: &ShutdownToken,
    ) -> AppResult<()> {
        info!(
            channels = self.channels.len(),
            tick_millis = self.global_tick.as_millis() as u64,
            "entering relay loop"
        );
        while !shutdown.is_cancelled() {
            self.run_tick(transmitter)?;
            tokio::time::sleep(self.global_tick).await;
        }
        info!("relay loop exited cleanly");
        Ok(())
    }
}

impl Default for DataChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
