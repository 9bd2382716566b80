// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The session worker and its handle.
//!
//! [`spawn`] starts a worker task owning the scheduler, the timeline
//! analytics and the publisher. The [`SessionHandle`] is the only way in:
//! commands are serialized through its mpsc channel and answered on
//! per-request oneshots, so concurrent callers never race on simulator
//! state. Command errors travel back to the sender only; they are never
//! broadcast. A multi-tick `run` yields between ticks and honors
//! cancellation there, committing every completed tick.

use crate::command::Command;
use crate::error::Error;
use crate::publisher::Publisher;
use schedsim_analytics::TimelineStats;
use schedsim_engine::{Scheduler, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

/// Capacity of the inbound command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Range-analytics answer over one CPU-timeline window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Busy ticks in the window.
    pub busy: u64,
    /// Idle ticks in the window.
    pub idle: u64,
    /// Utilization percentage over the window.
    pub utilization: f64,
    /// Longest consecutive busy run.
    pub longest_busy: u32,
    /// Longest consecutive idle run.
    pub longest_idle: u32,
}

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    Window {
        from: usize,
        to: usize,
        reply: oneshot::Sender<WindowStats>,
    },
    Subscribe {
        reply: oneshot::Sender<watch::Receiver<Arc<StateSnapshot>>>,
    },
}

/// Handle to a running session worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Request>,
    cancel: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Executes one control message and waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the command's own error, or [`Error::ChannelClosed`] when
    /// the worker has shut down.
    pub async fn execute(&self, command: Command) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Reads the current state without mutating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] when the worker has shut down.
    pub async fn snapshot(&self) -> Result<StateSnapshot, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot { reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Queries the range analytics over the inclusive CPU-timeline window
    /// `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] when the worker has shut down.
    pub async fn window_stats(&self, from: usize, to: usize) -> Result<WindowStats, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Window { from, to, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Registers a new snapshot subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] when the worker has shut down.
    pub async fn subscribe(&self) -> Result<watch::Receiver<Arc<StateSnapshot>>, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Subscribe { reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Requests cancellation of an in-flight `run`. Completed ticks stay
    /// committed; the cancellation point is always between ticks.
    pub fn cancel_run(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Spawns a session worker on the current tokio runtime.
#[must_use]
pub fn spawn() -> SessionHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let cancel = Arc::new(AtomicBool::new(false));
    let worker = Worker::new(Arc::clone(&cancel));
    drop(tokio::spawn(worker.run(rx)));
    SessionHandle { tx, cancel }
}

struct Worker {
    sim: Scheduler,
    stats: TimelineStats,
    publisher: Publisher,
    cancel: Arc<AtomicBool>,
}

impl Worker {
    fn new(cancel: Arc<AtomicBool>) -> Self {
        let sim = Scheduler::new();
        let publisher = Publisher::new(Arc::new(sim.snapshot()));
        Worker {
            sim,
            stats: TimelineStats::new(),
            publisher,
            cancel,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            match request {
                Request::Command { command, reply } => {
                    let result = self.handle(command).await;
                    if let Err(error) = &result {
                        warn!(%error, "command rejected");
                    }
                    let _ = reply.send(result);
                }
                Request::Snapshot { reply } => {
                    let _ = reply.send(self.sim.snapshot());
                }
                Request::Window { from, to, reply } => {
                    let _ = reply.send(self.window(from, to));
                }
                Request::Subscribe { reply } => {
                    let _ = reply.send(self.publisher.subscribe());
                }
            }
        }
        info!("session worker stopped");
    }

    /// Handles one command; a successful mutating (or `sync`) command
    /// broadcasts exactly one snapshot, a rejected command broadcasts
    /// nothing.
    async fn handle(&mut self, command: Command) -> Result<(), Error> {
        match command {
            Command::Init(args) => {
                self.sim.reset();
                self.sim.configure(args.to_config())?;
                for process in args.processes {
                    self.sim.add_process(process, false)?;
                }
            }
            Command::Tick => self.sim.tick()?,
            Command::Run { steps } => {
                self.cancel.store(false, Ordering::Relaxed);
                for _ in 0..steps {
                    if self.cancel.load(Ordering::Relaxed) || self.sim.is_complete() {
                        break;
                    }
                    self.sim.tick()?;
                    // The cancellation point sits between ticks; a tick
                    // itself never suspends.
                    tokio::task::yield_now().await;
                }
            }
            Command::AddProcess { process } => self.sim.add_process(process, true)?,
            Command::RemoveProcess { pid } => self.sim.remove_process(&pid)?,
            Command::ClearAdded => self.sim.clear_user_added(),
            Command::SetSpeed { tick_ms } => {
                let cfg = schedsim_config::SimConfig {
                    tick_ms,
                    ..self.sim.config().clone()
                };
                self.sim.configure(cfg)?;
            }
            Command::SetQuantum { quantum } => self.sim.set_quantum(quantum)?,
            Command::Config(args) => {
                let cfg = args.apply(self.sim.config());
                self.sim.configure(cfg)?;
            }
            Command::Reset => self.sim.reset(),
            Command::Sync => {}
        }
        self.broadcast();
        Ok(())
    }

    fn broadcast(&mut self) {
        let snapshot = self.sim.snapshot();
        self.stats.sync(&snapshot.gantt);
        self.publisher.publish(Arc::new(snapshot));
    }

    fn window(&self, from: usize, to: usize) -> WindowStats {
        WindowStats {
            busy: self.stats.busy_in(from, to),
            idle: self.stats.idle_in(from, to),
            utilization: self.stats.utilization(from, to),
            longest_busy: self.stats.longest_busy(from, to),
            longest_idle: self.stats.longest_idle(from, to),
        }
    }
}
