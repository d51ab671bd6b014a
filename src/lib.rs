//! # daq-relay
//!
//! Middleware relaying data out of a running DAQ session to live consumers
//! over a TCP pub/sub transport. The relay polls a set of processors and
//! periodic external commands on a single cooperative loop, buffers their
//! records per channel, and publishes batch-gated JSON snapshots.
//!
//! ## Crate Structure
//!
//! - **`buffer`**: Per-channel circular buffer of serialized records.
//! - **`channel`**: Publication channels with the attempt-counted batch gate.
//! - **`command`**: Rate-limited external command execution and scheduling.
//! - **`config`**: figment-backed JSON + environment configuration.
//! - **`detector`**: Bank-name to detector-name mapping files.
//! - **`dump`**: Parser for the textual output of the event-dump tool.
//! - **`error`**: The [`error::RelayError`] enum and its severity taxonomy.
//! - **`histogram`**: Run-scoped 1D/2D histogram store with lazy reset.
//! - **`logging`**: tracing subscriber setup.
//! - **`manager`**: Channel manager, global tick and the run loop.
//! - **`odb`**: Online-database snapshot sources.
//! - **`processor`**: The [`processor::Processor`] trait, builtin
//!   implementations and the type-name registry.
//! - **`shutdown`**: Signal-driven cooperative shutdown token.
//! - **`transport`**: The [`transport::Transmitter`] trait and the TCP
//!   fan-out publisher.

pub mod buffer;
pub mod channel;
pub mod command;
pub mod config;
pub mod detector;
pub mod dump;
pub mod error;
pub mod histogram;
pub mod logging;
pub mod manager;
pub mod odb;
pub mod processor;
pub mod shutdown;
pub mod transport;
