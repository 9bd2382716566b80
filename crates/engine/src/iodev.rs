// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-server FIFO I/O device.
//!
//! The device holds at most one active job plus an ordered waiting list and
//! never preempts. Service is tick-granular: every call to
//! [`IoDevice::advance`] grants the active job one tick of service; the job
//! is released on the advance *after* its final service tick, which keeps a
//! burst of length `n` occupying exactly `n` I/O-timeline slots. Released
//! processes re-enter the ready structure through the scheduler, not here.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct IoJob {
    pid: String,
    remaining: u64,
}

/// Outcome of one tick of I/O progress.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IoAdvance {
    /// Pid that received a tick of service, if any.
    pub served: Option<String>,
    /// Pid whose burst completed and left the device, if any.
    pub released: Option<String>,
}

/// The simulated I/O device.
#[derive(Debug, Default, Clone)]
pub struct IoDevice {
    active: Option<IoJob>,
    waiting: VecDeque<IoJob>,
}

impl IoDevice {
    /// Creates an idle device.
    #[must_use]
    pub fn new() -> Self {
        IoDevice::default()
    }

    /// Enqueues a burst of `length` ticks for `pid`, activating it
    /// immediately when the device is idle.
    pub fn enqueue(&mut self, pid: String, length: u64) {
        let job = IoJob {
            pid,
            remaining: length,
        };
        if self.active.is_none() {
            self.active = Some(job);
        } else {
            self.waiting.push_back(job);
        }
    }

    /// Advances the device by one tick.
    ///
    /// When a job finished its burst on a previous tick it is released now
    /// and the head of the waiting list is promoted and served in the same
    /// tick, so a backlogged device never idles between jobs.
    pub fn advance(&mut self) -> IoAdvance {
        let mut out = IoAdvance::default();
        let Some(job) = self.active.as_mut() else {
            return out;
        };

        if job.remaining == 0 {
            let done = self.active.take().map(|j| j.pid);
            out.released = done;
            self.active = self.waiting.pop_front();
        }
        if let Some(job) = self.active.as_mut() {
            if job.remaining > 0 {
                job.remaining -= 1;
                out.served = Some(job.pid.clone());
            }
        }
        out
    }

    /// Pid of the active job, if any.
    #[must_use]
    pub fn active_pid(&self) -> Option<&str> {
        self.active.as_ref().map(|j| j.pid.as_str())
    }

    /// Pids waiting for the device, in service order.
    #[must_use]
    pub fn waiting_pids(&self) -> Vec<String> {
        self.waiting.iter().map(|j| j.pid.clone()).collect()
    }

    /// Drops `pid` from the device wherever it sits.
    pub fn remove(&mut self, pid: &str) {
        if self.active.as_ref().is_some_and(|j| j.pid == pid) {
            self.active = self.waiting.pop_front();
        } else {
            self.waiting.retain(|j| j.pid != pid);
        }
    }

    /// Returns the device to idle.
    pub fn clear(&mut self) {
        self.active = None;
        self.waiting.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;

    #[test]
    fn serves_then_releases_one_tick_later() {
        let mut dev = IoDevice::new();
        dev.enqueue("P1".to_owned(), 2);

        let a = dev.advance();
        assert_eq!(a.served.as_deref(), Some("P1"));
        assert_eq!(a.released, None);

        let a = dev.advance();
        assert_eq!(a.served.as_deref(), Some("P1"));
        assert_eq!(a.released, None);

        let a = dev.advance();
        assert_eq!(a.served, None);
        assert_eq!(a.released.as_deref(), Some("P1"));
        assert_eq!(dev.active_pid(), None);
    }

    #[test]
    fn fifo_promotion_keeps_device_busy() {
        let mut dev = IoDevice::new();
        dev.enqueue("P1".to_owned(), 1);
        dev.enqueue("P2".to_owned(), 1);
        assert_eq!(dev.active_pid(), Some("P1"));
        assert_eq!(dev.waiting_pids(), vec!["P2".to_owned()]);

        let a = dev.advance();
        assert_eq!(a.served.as_deref(), Some("P1"));

        // P1 releases and P2 is promoted and served within the same tick.
        let a = dev.advance();
        assert_eq!(a.released.as_deref(), Some("P1"));
        assert_eq!(a.served.as_deref(), Some("P2"));

        let a = dev.advance();
        assert_eq!(a.released.as_deref(), Some("P2"));
        assert_eq!(a.served, None);
    }

    #[test]
    fn remove_active_promotes_head() {
        let mut dev = IoDevice::new();
        dev.enqueue("P1".to_owned(), 3);
        dev.enqueue("P2".to_owned(), 2);
        dev.remove("P1");
        assert_eq!(dev.active_pid(), Some("P2"));
        assert!(dev.waiting_pids().is_empty());
    }
}
