// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Top-level simulation configuration.

use crate::error::Error;
use crate::policy::{MemoryMode, ReplacementPolicy, SchedPolicy};
use serde::{Deserialize, Serialize};

const DEFAULT_TICK_MS: u64 = 500;
const DEFAULT_PAGE_SIZE: u64 = 4096;
const DEFAULT_FRAME_COUNT: usize = 8;
const DEFAULT_FAULT_PENALTY: u64 = 3;

/// Complete configuration of one simulator instance.
///
/// Applied atomically: validation happens before any field reaches the
/// engine, so a rejected configuration leaves the running simulation as it
/// was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// CPU scheduling policy.
    pub policy: SchedPolicy,
    /// Pacing hint for observers, in milliseconds per tick. The tick itself
    /// is logical; this value is forwarded, never acted upon.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Time quantum for RR/MLQ; must be present and >= 1 for those policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u64>,
    /// Whether the paged-memory subsystem is active.
    #[serde(default)]
    pub memory_mode: MemoryMode,
    /// Page-replacement policy in full memory mode.
    #[serde(default = "default_replacement")]
    pub replacement: ReplacementPolicy,
    /// Global page size in bytes; a positive power of two.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Number of physical frames in full memory mode.
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
    /// Global page-fault penalty in ticks.
    #[serde(default = "default_fault_penalty")]
    pub fault_penalty: u64,
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_replacement() -> ReplacementPolicy {
    ReplacementPolicy::Lru
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_frame_count() -> usize {
    DEFAULT_FRAME_COUNT
}

fn default_fault_penalty() -> u64 {
    DEFAULT_FAULT_PENALTY
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            policy: SchedPolicy::Fcfs,
            tick_ms: DEFAULT_TICK_MS,
            quantum: None,
            memory_mode: MemoryMode::default(),
            replacement: default_replacement(),
            page_size: DEFAULT_PAGE_SIZE,
            frame_count: DEFAULT_FRAME_COUNT,
            fault_penalty: DEFAULT_FAULT_PENALTY,
        }
    }
}

impl SimConfig {
    /// Validates the configuration as a whole.
    ///
    /// # Errors
    ///
    /// Rejects quantum-less RR/MLQ, a zero quantum, an unusable frame count
    /// or page size, and the OPT replacement policy (which needs the future
    /// reference string the live simulator does not have).
    pub fn validate(&self) -> Result<(), Error> {
        if self.policy.uses_quantum() {
            match self.quantum {
                None => {
                    return Err(Error::MissingQuantum {
                        policy: self.policy,
                    });
                }
                Some(0) => {
                    return Err(Error::InvalidQuantum {
                        policy: self.policy,
                        quantum: 0,
                    });
                }
                Some(_) => {}
            }
        }
        if self.memory_mode == MemoryMode::Full {
            if self.frame_count == 0 {
                return Err(Error::InvalidFrameCount {
                    frames: self.frame_count,
                });
            }
            if self.page_size == 0 || !self.page_size.is_power_of_two() {
                return Err(Error::InvalidPageSize {
                    page_size: self.page_size,
                });
            }
            if self.replacement == ReplacementPolicy::Opt {
                return Err(Error::UnsupportedReplacement {
                    policy: self.replacement,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn rr_requires_quantum() {
        let cfg = SimConfig {
            policy: SchedPolicy::Rr,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::MissingQuantum { .. })));

        let cfg = SimConfig {
            policy: SchedPolicy::Rr,
            quantum: Some(0),
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidQuantum { .. })));

        let cfg = SimConfig {
            policy: SchedPolicy::Rr,
            quantum: Some(2),
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn full_mode_rejects_bad_memory_shape() {
        let cfg = SimConfig {
            memory_mode: MemoryMode::Full,
            page_size: 3000,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidPageSize { .. })));

        let cfg = SimConfig {
            memory_mode: MemoryMode::Full,
            frame_count: 0,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidFrameCount { .. })));
    }

    #[test]
    fn opt_rejected_at_runtime() {
        let cfg = SimConfig {
            memory_mode: MemoryMode::Full,
            replacement: ReplacementPolicy::Opt,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(Error::UnsupportedReplacement { .. })
        ));
    }
}
