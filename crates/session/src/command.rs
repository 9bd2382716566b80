// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The inbound control-message contract.
//!
//! Messages arrive as JSON objects tagged by a `type` field, e.g.
//! `{"type": "run", "steps": 25}` or `{"type": "set_quantum", "quantum": 2}`.
//! Field names mirror the external wire contract; [`InitArgs`] and
//! [`ConfigArgs`] fold their optional fields over the configuration
//! defaults.

use crate::error::Error;
use schedsim_config::{MemoryMode, ProcessSpec, ReplacementPolicy, SchedPolicy, SimConfig};
use serde::{Deserialize, Serialize};

/// One inbound control message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Reset, configure and admit an initial workload.
    Init(InitArgs),
    /// Advance one tick.
    Tick,
    /// Advance `steps` ticks; cancellable between ticks.
    Run {
        /// Number of ticks to advance.
        #[serde(default = "default_steps")]
        steps: u64,
    },
    /// Append a process to the pending arrivals.
    AddProcess {
        /// The process to add.
        process: ProcessSpec,
    },
    /// Remove a process and re-admit the remaining ones from tick zero.
    RemoveProcess {
        /// Pid to remove.
        pid: String,
    },
    /// Drop every interactively added process.
    ClearAdded,
    /// Update the pacing hint forwarded to observers.
    SetSpeed {
        /// Milliseconds per tick.
        tick_ms: u64,
    },
    /// Re-arm the time quantum.
    SetQuantum {
        /// New quantum; must be at least 1 for RR/MLQ.
        quantum: u64,
    },
    /// Live-reconfigure a subset of the settings.
    Config(ConfigArgs),
    /// Revert to the initial configuration with no processes.
    Reset,
    /// Broadcast the current state without mutating it.
    Sync,
}

fn default_steps() -> u64 {
    1
}

/// Arguments of the `init` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitArgs {
    /// Scheduling policy to configure. The one required field.
    pub policy: SchedPolicy,
    /// Pacing hint in milliseconds per tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_ms: Option<u64>,
    /// Time quantum for RR/MLQ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u64>,
    /// Memory mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mode: Option<MemoryMode>,
    /// Number of physical frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    /// Page-replacement policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_algo: Option<ReplacementPolicy>,
    /// Page size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// Global fault penalty in ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_penalty: Option<u64>,
    /// Initial workload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ProcessSpec>,
}

impl InitArgs {
    /// Folds the provided fields over the configuration defaults.
    #[must_use]
    pub fn to_config(&self) -> SimConfig {
        let base = SimConfig::default();
        SimConfig {
            policy: self.policy,
            tick_ms: self.tick_ms.unwrap_or(base.tick_ms),
            quantum: self.quantum.or(base.quantum),
            memory_mode: self.memory_mode.unwrap_or(base.memory_mode),
            replacement: self.mem_algo.unwrap_or(base.replacement),
            page_size: self.page_size.unwrap_or(base.page_size),
            frame_count: self.frames.unwrap_or(base.frame_count),
            fault_penalty: self.fault_penalty.unwrap_or(base.fault_penalty),
        }
    }
}

/// Arguments of the `config` message; every field is optional and falls
/// back to the active configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigArgs {
    /// Scheduling policy. Changing it restarts the simulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<SchedPolicy>,
    /// Pacing hint in milliseconds per tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_ms: Option<u64>,
    /// Time quantum for RR/MLQ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum: Option<u64>,
    /// Memory mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mode: Option<MemoryMode>,
    /// Number of physical frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    /// Page-replacement policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_algo: Option<ReplacementPolicy>,
    /// Page size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// Global fault penalty in ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_penalty: Option<u64>,
}

impl ConfigArgs {
    /// Folds the provided fields over the active configuration.
    #[must_use]
    pub fn apply(&self, active: &SimConfig) -> SimConfig {
        SimConfig {
            policy: self.policy.unwrap_or(active.policy),
            tick_ms: self.tick_ms.unwrap_or(active.tick_ms),
            quantum: self.quantum.or(active.quantum),
            memory_mode: self.memory_mode.unwrap_or(active.memory_mode),
            replacement: self.mem_algo.unwrap_or(active.replacement),
            page_size: self.page_size.unwrap_or(active.page_size),
            frame_count: self.frames.unwrap_or(active.frame_count),
            fault_penalty: self.fault_penalty.unwrap_or(active.fault_penalty),
        }
    }
}

/// Decodes one control message from its JSON wire form.
///
/// # Errors
///
/// Returns [`Error::Decode`] for malformed or unknown messages.
pub fn parse_command(raw: &str) -> Result<Command, Error> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;

    #[test]
    fn parses_tagged_messages() {
        assert_eq!(parse_command(r#"{"type":"tick"}"#).expect("parses"), Command::Tick);
        assert_eq!(
            parse_command(r#"{"type":"run","steps":25}"#).expect("parses"),
            Command::Run { steps: 25 }
        );
        assert_eq!(
            parse_command(r#"{"type":"run"}"#).expect("parses"),
            Command::Run { steps: 1 }
        );
        assert_eq!(
            parse_command(r#"{"type":"remove_process","pid":"P2"}"#).expect("parses"),
            Command::RemoveProcess {
                pid: "P2".to_owned()
            }
        );
    }

    #[test]
    fn rejects_unknown_messages() {
        assert!(parse_command(r#"{"type":"warp"}"#).is_err());
        assert!(parse_command("not json").is_err());
    }

    #[test]
    fn init_folds_over_defaults() {
        let cmd = parse_command(
            r#"{"type":"init","policy":"RR","quantum":2,
                "processes":[{"pid":"P1","bursts":[5]}]}"#,
        )
        .expect("parses");
        let Command::Init(args) = cmd else {
            panic!("expected init");
        };
        let cfg = args.to_config();
        assert_eq!(cfg.policy, SchedPolicy::Rr);
        assert_eq!(cfg.quantum, Some(2));
        assert_eq!(cfg.page_size, SimConfig::default().page_size);
        assert_eq!(args.processes.len(), 1);
    }

    #[test]
    fn config_preserves_unset_fields() {
        let active = SimConfig {
            policy: SchedPolicy::Sjf,
            tick_ms: 250,
            ..SimConfig::default()
        };
        let args = ConfigArgs {
            tick_ms: Some(100),
            ..ConfigArgs::default()
        };
        let merged = args.apply(&active);
        assert_eq!(merged.policy, SchedPolicy::Sjf);
        assert_eq!(merged.tick_ms, 100);
    }
}
