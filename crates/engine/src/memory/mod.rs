// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Paged virtual-memory subsystem.
//!
//! The manager owns the global frame table and one page table per
//! registered process. Translation is strict: `VPN = (VA - base) /
//! page_size` for in-range addresses; an out-of-range address is redirected
//! to the fault page `(VA mod vm_size) / page_size` and flagged as wrapped
//! rather than failing the simulation. Frame ownership is exclusive: a
//! frame maps to at most one `(pid, VPN)` and every present page-table
//! entry points back at a frame owned by that pair.

/// Deterministic virtual-address generators.
pub mod pattern;
mod replacement;

use crate::memory::pattern::AddrStream;
use schedsim_config::{MemorySpec, ReplacementPolicy, SimConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// How many translation records the manager retains for observers.
const RECENT_STEPS_CAP: usize = 64;

/// Owner of an occupied frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOwner {
    /// Owning process.
    pub pid: String,
    /// Virtual page number mapped into the frame.
    pub vpn: u64,
}

/// One physical frame of the global frame table.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Current owner; `None` for a free frame.
    pub owner: Option<FrameOwner>,
    /// Tick the current page was loaded.
    pub loaded_at: u64,
    /// Tick of the most recent access.
    pub last_used: u64,
    /// Number of accesses since load.
    pub frequency: u64,
    /// Second-chance reference bit.
    pub referenced: bool,
}

/// One per-process page-table entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEntry {
    /// Whether the page is resident.
    pub present: bool,
    /// Physical frame number when resident.
    pub pfn: Option<usize>,
    /// Tick of the most recent access.
    pub last_used: u64,
    /// Lifetime access count.
    pub frequency: u64,
    /// Write-back flag. The simulator models reads only, so this stays
    /// clear; it is part of the wire contract.
    pub dirty: bool,
}

/// One translation, as recorded for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Tick of the reference.
    pub tick: u64,
    /// Referencing process.
    pub pid: String,
    /// Virtual address referenced.
    pub va: u64,
    /// Resolved virtual page number.
    pub vpn: u64,
    /// Physical frame the page resolved to.
    pub pfn: usize,
    /// Whether the reference faulted.
    pub fault: bool,
    /// Pid of the evicted page's owner, when the fault evicted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evicted_pid: Option<String>,
    /// VPN of the evicted page, when the fault evicted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evicted_vpn: Option<u64>,
    /// Whether the address was out of range and redirected.
    #[serde(default)]
    pub wrapped: bool,
}

impl fmt::Display for TranslationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={}: {} VA={} VPN={} PFN={} {}",
            self.tick,
            self.pid,
            self.va,
            self.vpn,
            self.pfn,
            if self.fault { "FAULT" } else { "HIT" }
        )?;
        if let (Some(pid), Some(vpn)) = (&self.evicted_pid, self.evicted_vpn) {
            write!(f, " evict={pid}/{vpn}")?;
        }
        if self.wrapped {
            write!(f, " (wrapped)")?;
        }
        Ok(())
    }
}

/// Outcome of one execute-step worth of memory references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Whether the step ended in a page fault.
    pub faulted: bool,
}

/// The paged-memory manager.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    page_size: u64,
    replacement: ReplacementPolicy,
    frames: Vec<Frame>,
    clock_hand: usize,
    specs: HashMap<String, MemorySpec>,
    streams: HashMap<String, AddrStream>,
    page_tables: BTreeMap<String, BTreeMap<u64, PageEntry>>,
    hits: u64,
    faults: u64,
    recent: VecDeque<TranslationRecord>,
    last_log: Vec<String>,
}

impl MemoryManager {
    /// Builds a manager shaped by the simulation configuration.
    #[must_use]
    pub fn new(cfg: &SimConfig) -> Self {
        MemoryManager {
            page_size: cfg.page_size,
            replacement: cfg.replacement,
            frames: (0..cfg.frame_count).map(|_| Frame::default()).collect(),
            clock_hand: 0,
            specs: HashMap::new(),
            streams: HashMap::new(),
            page_tables: BTreeMap::new(),
            hits: 0,
            faults: 0,
            recent: VecDeque::new(),
            last_log: Vec::new(),
        }
    }

    /// Registers a process's memory behavior. Processes without a memory
    /// spec are simply never registered and issue no references.
    pub fn register(&mut self, pid: &str, spec: &MemorySpec) {
        let stream = AddrStream::new(spec, self.page_size);
        let mut table = BTreeMap::new();
        for &vpn in stream.working_set() {
            let _ = table.entry(vpn).or_insert_with(PageEntry::default);
        }
        let _ = self.page_tables.insert(pid.to_owned(), table);
        let _ = self.streams.insert(pid.to_owned(), stream);
        let _ = self.specs.insert(pid.to_owned(), spec.clone());
    }

    /// Unregisters a process and frees every frame it owns.
    pub fn remove(&mut self, pid: &str) {
        for frame in &mut self.frames {
            if frame.owner.as_ref().is_some_and(|o| o.pid == pid) {
                *frame = Frame::default();
            }
        }
        let _ = self.specs.remove(pid);
        let _ = self.streams.remove(pid);
        let _ = self.page_tables.remove(pid);
    }

    /// Clears all translation state, keeping registered processes, and
    /// restarts their reference streams from the beginning.
    pub fn reset(&mut self) {
        for frame in &mut self.frames {
            *frame = Frame::default();
        }
        self.clock_hand = 0;
        self.hits = 0;
        self.faults = 0;
        self.recent.clear();
        self.last_log.clear();
        let specs: Vec<(String, MemorySpec)> = self
            .specs
            .iter()
            .map(|(pid, spec)| (pid.clone(), spec.clone()))
            .collect();
        for (pid, spec) in specs {
            self.register(&pid, &spec);
        }
    }

    /// Returns the per-process fault penalty, falling back to `global`.
    #[must_use]
    pub fn fault_penalty_for(&self, pid: &str, global: u64) -> u64 {
        self.specs
            .get(pid)
            .and_then(|s| s.fault_penalty)
            .unwrap_or(global)
    }

    /// Performs one execute-step worth of references for `pid` at `now`.
    ///
    /// Up to `refs_per_tick` addresses are translated; the step stops at
    /// the first fault. Returns `None` for processes without a memory spec.
    pub fn step(&mut self, pid: &str, now: u64) -> Option<StepOutcome> {
        let refs = self.specs.get(pid)?.refs_per_tick;
        self.last_log.clear();
        let mut faulted = false;
        for _ in 0..refs {
            let va = self.streams.get_mut(pid)?.next_va();
            let record = self.translate(pid, va, now);
            faulted = record.fault;
            self.last_log.push(record.to_string());
            if self.recent.len() == RECENT_STEPS_CAP {
                let _ = self.recent.pop_front();
            }
            self.recent.push_back(record);
            if faulted {
                break;
            }
        }
        Some(StepOutcome { faulted })
    }

    fn translate(&mut self, pid: &str, va: u64, now: u64) -> TranslationRecord {
        let spec = &self.specs[pid];
        let (base, vm_size) = (spec.base, spec.vm_size);
        let in_range = va >= base && va - base < vm_size;
        let (vpn, wrapped) = if in_range {
            ((va - base) / self.page_size, false)
        } else {
            ((va % vm_size) / self.page_size, true)
        };

        let entry = self
            .page_tables
            .entry(pid.to_owned())
            .or_default()
            .entry(vpn)
            .or_default();

        if entry.present {
            let pfn = entry.pfn.unwrap_or(0);
            entry.last_used = now;
            entry.frequency += 1;
            if let Some(frame) = self.frames.get_mut(pfn) {
                frame.last_used = now;
                frame.frequency += 1;
                frame.referenced = true;
            }
            self.hits += 1;
            return TranslationRecord {
                tick: now,
                pid: pid.to_owned(),
                va,
                vpn,
                pfn,
                fault: false,
                evicted_pid: None,
                evicted_vpn: None,
                wrapped,
            };
        }

        // Fault: take a free frame or evict a victim.
        self.faults += 1;
        let free = self.frames.iter().position(|f| f.owner.is_none());
        let (pfn, evicted) = match free {
            Some(pfn) => (pfn, None),
            None => {
                let victim =
                    replacement::choose_victim(self.replacement, &mut self.frames, &mut self.clock_hand);
                let owner = self.frames[victim].owner.take();
                if let Some(owner) = &owner {
                    if let Some(victim_entry) = self
                        .page_tables
                        .get_mut(&owner.pid)
                        .and_then(|t| t.get_mut(&owner.vpn))
                    {
                        victim_entry.present = false;
                        victim_entry.pfn = None;
                    }
                }
                (victim, owner)
            }
        };

        self.frames[pfn] = Frame {
            owner: Some(FrameOwner {
                pid: pid.to_owned(),
                vpn,
            }),
            loaded_at: now,
            last_used: now,
            frequency: 1,
            referenced: true,
        };
        let entry = self
            .page_tables
            .entry(pid.to_owned())
            .or_default()
            .entry(vpn)
            .or_default();
        entry.present = true;
        entry.pfn = Some(pfn);
        entry.last_used = now;
        entry.frequency += 1;

        TranslationRecord {
            tick: now,
            pid: pid.to_owned(),
            va,
            vpn,
            pfn,
            fault: true,
            evicted_pid: evicted.as_ref().map(|o| o.pid.clone()),
            evicted_vpn: evicted.as_ref().map(|o| o.vpn),
            wrapped,
        }
    }

    /// The global frame table.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The per-process page tables, keyed by pid.
    #[must_use]
    pub fn page_tables(&self) -> &BTreeMap<String, BTreeMap<u64, PageEntry>> {
        &self.page_tables
    }

    /// Lifetime hit count.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lifetime fault count.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Hits over total references; zero before any reference.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.faults;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// The most recent translation records, oldest first.
    #[must_use]
    pub fn recent_steps(&self) -> Vec<TranslationRecord> {
        self.recent.iter().cloned().collect()
    }

    /// Rendered translation lines of the current tick.
    #[must_use]
    pub fn last_log(&self) -> &[String] {
        &self.last_log
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_config::{MemoryMode, RefPattern};

    fn full_config(frames: usize, replacement: ReplacementPolicy) -> SimConfig {
        SimConfig {
            memory_mode: MemoryMode::Full,
            frame_count: frames,
            replacement,
            page_size: 4096,
            ..SimConfig::default()
        }
    }

    fn seq_spec(ws: usize) -> MemorySpec {
        MemorySpec {
            vm_size: 4096 * 16,
            base: 0,
            working_set: ws,
            pages: None,
            pattern: RefPattern::Seq,
            custom_addrs: Vec::new(),
            refs_per_tick: 1,
            fault_penalty: None,
            seed: 0,
        }
    }

    #[test]
    fn faults_then_hits_within_frame_budget() {
        let mut mm = MemoryManager::new(&full_config(2, ReplacementPolicy::Lru));
        mm.register("P1", &seq_spec(2));
        assert!(mm.step("P1", 0).expect("registered").faulted);
        assert!(mm.step("P1", 1).expect("registered").faulted);
        assert!(!mm.step("P1", 2).expect("registered").faulted);
        assert!(!mm.step("P1", 3).expect("registered").faulted);
        assert_eq!(mm.faults(), 2);
        assert_eq!(mm.hits(), 2);
    }

    #[test]
    fn lru_thrash_evicts_least_recent() {
        // SEQ over 3 pages with 2 frames: every reference faults and the
        // victim is always the least recently used page.
        let mut mm = MemoryManager::new(&full_config(2, ReplacementPolicy::Lru));
        mm.register("P1", &seq_spec(3));
        assert!(mm.step("P1", 0).expect("registered").faulted); // load vpn 0
        assert!(mm.step("P1", 1).expect("registered").faulted); // load vpn 1
        assert!(mm.step("P1", 2).expect("registered").faulted); // evicts vpn 0
        let last = mm.recent_steps().pop().expect("recorded");
        assert_eq!(last.evicted_vpn, Some(0));
        assert_eq!(last.vpn, 2);
    }

    #[test]
    fn frame_ownership_is_exclusive() {
        let mut mm = MemoryManager::new(&full_config(4, ReplacementPolicy::Fifo));
        mm.register("P1", &seq_spec(3));
        mm.register("P2", &seq_spec(3));
        for now in 0..12 {
            let _ = mm.step("P1", now);
            let _ = mm.step("P2", now);
        }
        for (pfn, frame) in mm.frames().iter().enumerate() {
            if let Some(owner) = &frame.owner {
                let entry = &mm.page_tables()[&owner.pid][&owner.vpn];
                assert!(entry.present);
                assert_eq!(entry.pfn, Some(pfn));
            }
        }
        for (pid, table) in mm.page_tables() {
            for (vpn, entry) in table {
                if entry.present {
                    let pfn = entry.pfn.expect("present entries carry a frame");
                    let owner = mm.frames()[pfn].owner.as_ref().expect("owned");
                    assert_eq!((&owner.pid, owner.vpn), (pid, *vpn));
                }
            }
        }
    }

    #[test]
    fn out_of_range_address_wraps_onto_fault_page() {
        let mut mm = MemoryManager::new(&full_config(2, ReplacementPolicy::Lru));
        let mut spec = seq_spec(1);
        spec.pattern = RefPattern::Custom;
        spec.vm_size = 4096 * 4;
        spec.custom_addrs = vec![4096 * 100 + 5];
        mm.register("P1", &spec);
        let _ = mm.step("P1", 0);
        let rec = mm.recent_steps().pop().expect("recorded");
        assert!(rec.wrapped);
        assert_eq!(rec.vpn, (4096 * 100 + 5) % (4096 * 4) / 4096);
        assert!(rec.to_string().contains("(wrapped)"));
    }

    #[test]
    fn remove_frees_owned_frames() {
        let mut mm = MemoryManager::new(&full_config(2, ReplacementPolicy::Lru));
        mm.register("P1", &seq_spec(2));
        let _ = mm.step("P1", 0);
        let _ = mm.step("P1", 1);
        mm.remove("P1");
        assert!(mm.frames().iter().all(|f| f.owner.is_none()));
    }
}
