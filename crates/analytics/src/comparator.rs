// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Policy comparison over one workload.
//!
//! Every supported policy replays the same workload snapshot to completion
//! under a bounded tick budget. The resulting cohort of metric rows feeds
//! three derivations: per-policy fairness statistics, a Pareto front under
//! metric-wise domination, and a weighted ranking whose weights follow the
//! optimization mode and shift with workload signals. Metrics are
//! robust-normalized per cohort (median/IQR z-score through a sigmoid, with
//! a min-max fallback on zero IQR) so a single outlier metric cannot
//! dominate the score.

use crate::Error;
use schedsim_config::{ProcessSpec, SchedPolicy, SimConfig};
use schedsim_engine::Scheduler;
use schedsim_engine::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ticks each policy replay may consume before it is cut off.
const TICK_BUDGET: u64 = 50_000;
/// Quantum used for RR/MLQ replays when the base configuration has none.
const DEFAULT_QUANTUM: u64 = 2;
/// Relative score gaps separating the confidence bands.
const HIGH_GAP: f64 = 0.08;
const MEDIUM_GAP: f64 = 0.04;

/// What the weighted ranking optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMode {
    /// Favor finishing work: throughput, makespan, utilization.
    Throughput,
    /// Favor latency: response and wait times.
    Responsiveness,
    /// Favor even treatment: wait-time spread and worst cases.
    Fairness,
}

impl fmt::Display for OptimizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OptimizeMode::Throughput => "throughput",
            OptimizeMode::Responsiveness => "responsiveness",
            OptimizeMode::Fairness => "fairness",
        };
        write!(f, "{label}")
    }
}

/// How decisive the winning score is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// The winner leads by a clear relative margin.
    High,
    /// The winner leads by a modest margin.
    Medium,
    /// A close call; the top contenders are nearly tied.
    Low,
}

/// Wait-time fairness statistics of one policy replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessStats {
    /// Worst per-process wait.
    pub max_wait: u64,
    /// 95th-percentile wait (nearest rank).
    pub p95_wait: u64,
    /// Population standard deviation of waits.
    pub wait_stddev: f64,
    /// Whether the worst wait indicates starvation.
    pub starvation: bool,
}

/// One policy's replay result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    /// The policy that ran.
    pub policy: SchedPolicy,
    /// Whether the workload finished within the tick budget.
    pub completed: bool,
    /// Aggregate metrics of the replay.
    pub metrics: Metrics,
    /// Fairness statistics of the replay.
    pub fairness: FairnessStats,
    /// Per-process waits, in pid order.
    pub waits: Vec<u64>,
}

/// One row of the weighted ranking, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPolicy {
    /// The ranked policy.
    pub policy: SchedPolicy,
    /// Weighted score; lower is better.
    pub score: f64,
}

/// Complete comparison result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// The optimization mode the ranking used.
    pub mode: OptimizeMode,
    /// Raw replay outcomes, in policy order.
    pub outcomes: Vec<PolicyOutcome>,
    /// Policies not dominated on every metric.
    pub pareto_front: Vec<SchedPolicy>,
    /// Weighted ranking, best first.
    pub ranking: Vec<RankedPolicy>,
    /// The winning policy.
    pub best: SchedPolicy,
    /// How decisive the win is.
    pub confidence: Confidence,
}

/// Runs every supported policy over `workload` and derives the report.
///
/// # Errors
///
/// Returns [`Error::EmptyWorkload`] for an empty workload and wraps engine
/// errors raised while replaying.
pub fn compare(
    workload: &[ProcessSpec],
    base: &SimConfig,
    mode: OptimizeMode,
) -> Result<ComparisonReport, Error> {
    if workload.is_empty() {
        return Err(Error::EmptyWorkload);
    }

    let mut outcomes = Vec::with_capacity(SchedPolicy::ALL.len());
    for policy in SchedPolicy::ALL {
        outcomes.push(run_policy(policy, workload, base)?);
    }

    let pareto_front = pareto_front(&outcomes);
    let weights = weights(mode, &profile(workload));
    let ranking = rank(&outcomes, &weights, mode);
    let best = ranking[0].policy;
    let confidence = confidence(&ranking);

    Ok(ComparisonReport {
        mode,
        outcomes,
        pareto_front,
        ranking,
        best,
        confidence,
    })
}

fn run_policy(
    policy: SchedPolicy,
    workload: &[ProcessSpec],
    base: &SimConfig,
) -> Result<PolicyOutcome, Error> {
    let mut sim = Scheduler::new();
    sim.configure(SimConfig {
        policy,
        quantum: base.quantum.or(Some(DEFAULT_QUANTUM)),
        ..base.clone()
    })?;
    for spec in workload {
        sim.add_process(spec.clone(), false)?;
    }
    for _ in 0..TICK_BUDGET {
        if sim.is_complete() {
            break;
        }
        sim.tick()?;
    }
    let completed = sim.is_complete();
    let snap = sim.snapshot();
    let waits: Vec<u64> = snap.per_process.iter().map(|p| p.wait).collect();
    Ok(PolicyOutcome {
        policy,
        completed,
        metrics: snap.metrics,
        fairness: fairness(&waits),
        waits,
    })
}

/// Derives the fairness statistics of one wait-time cohort.
#[must_use]
pub fn fairness(waits: &[u64]) -> FairnessStats {
    if waits.is_empty() {
        return FairnessStats {
            max_wait: 0,
            p95_wait: 0,
            wait_stddev: 0.0,
            starvation: false,
        };
    }
    let mut sorted = waits.to_vec();
    sorted.sort_unstable();
    let max_wait = *sorted.last().unwrap_or(&0);
    // Nearest-rank percentile: rank = ceil(0.95 * n), 1-based.
    let rank = (0.95 * sorted.len() as f64).ceil() as usize;
    let p95_wait = sorted[rank.clamp(1, sorted.len()) - 1];
    let mean = waits.iter().sum::<u64>() as f64 / waits.len() as f64;
    let variance = waits
        .iter()
        .map(|&w| (w as f64 - mean).powi(2))
        .sum::<f64>()
        / waits.len() as f64;
    let wait_stddev = variance.sqrt();
    let starvation = max_wait as f64 >= (2.0 * mean).max(10.0);
    FairnessStats {
        max_wait,
        p95_wait,
        wait_stddev,
        starvation,
    }
}

// ---- metric cohort ------------------------------------------------------

/// Number of metrics entering domination and scoring.
const METRIC_COUNT: usize = 9;
/// Direction per metric: `true` when higher is better.
const MAXIMIZE: [bool; METRIC_COUNT] = [
    false, false, false, false, false, false, false, true, true,
];

fn metric_vector(o: &PolicyOutcome) -> [f64; METRIC_COUNT] {
    [
        o.metrics.avg_wait,
        o.metrics.avg_turnaround,
        o.metrics.avg_response,
        o.metrics.makespan as f64,
        o.fairness.p95_wait as f64,
        o.fairness.max_wait as f64,
        o.fairness.wait_stddev,
        o.metrics.cpu_util,
        o.metrics.throughput,
    ]
}

fn pareto_front(outcomes: &[PolicyOutcome]) -> Vec<SchedPolicy> {
    let vectors: Vec<[f64; METRIC_COUNT]> = outcomes.iter().map(metric_vector).collect();
    let dominates = |a: &[f64; METRIC_COUNT], b: &[f64; METRIC_COUNT]| {
        let mut strict = false;
        for i in 0..METRIC_COUNT {
            let (x, y) = if MAXIMIZE[i] {
                (b[i], a[i])
            } else {
                (a[i], b[i])
            };
            if x > y {
                return false;
            }
            if x < y {
                strict = true;
            }
        }
        strict
    };
    outcomes
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            !vectors
                .iter()
                .enumerate()
                .any(|(j, other)| j != *i && dominates(other, &vectors[*i]))
        })
        .map(|(_, o)| o.policy)
        .collect()
}

// ---- weighted ranking ---------------------------------------------------

/// Signals of the workload that shift the mode weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadProfile {
    /// I/O ticks over total burst ticks.
    pub io_ratio: f64,
    /// Coefficient of variation of the CPU burst lengths.
    pub burst_cv: f64,
    /// Spread between the first and the last arrival.
    pub arrival_spread: u64,
    /// Number of processes.
    pub process_count: usize,
}

/// Derives the workload signals that shift the ranking weights.
#[must_use]
pub fn profile(workload: &[ProcessSpec]) -> WorkloadProfile {
    let total_cpu: u64 = workload.iter().map(ProcessSpec::total_cpu).sum();
    let total_io: u64 = workload.iter().map(ProcessSpec::total_io).sum();
    let io_ratio = if total_cpu + total_io == 0 {
        0.0
    } else {
        total_io as f64 / (total_cpu + total_io) as f64
    };

    let cpu_bursts: Vec<f64> = workload
        .iter()
        .flat_map(|s| s.bursts.iter().step_by(2).map(|&b| b as f64))
        .collect();
    let burst_cv = if cpu_bursts.is_empty() {
        0.0
    } else {
        let mean = cpu_bursts.iter().sum::<f64>() / cpu_bursts.len() as f64;
        if mean == 0.0 {
            0.0
        } else {
            let var = cpu_bursts.iter().map(|b| (b - mean).powi(2)).sum::<f64>()
                / cpu_bursts.len() as f64;
            var.sqrt() / mean
        }
    };

    let min_arrival = workload.iter().map(|s| s.arrival).min().unwrap_or(0);
    let max_arrival = workload.iter().map(|s| s.arrival).max().unwrap_or(0);
    WorkloadProfile {
        io_ratio,
        burst_cv,
        arrival_spread: max_arrival - min_arrival,
        process_count: workload.len(),
    }
}

// Metric indexes into the weight vectors.
const AVG_WT: usize = 0;
const AVG_TAT: usize = 1;
const AVG_RT: usize = 2;
const MAKESPAN: usize = 3;
const P95_WT: usize = 4;
const MAX_WT: usize = 5;
const WT_STD: usize = 6;
const CPU_UTIL: usize = 7;
const THROUGHPUT: usize = 8;

fn weights(mode: OptimizeMode, profile: &WorkloadProfile) -> [f64; METRIC_COUNT] {
    let mut w = match mode {
        OptimizeMode::Throughput => {
            let mut w = [0.0; METRIC_COUNT];
            w[THROUGHPUT] = 0.30;
            w[MAKESPAN] = 0.20;
            w[CPU_UTIL] = 0.15;
            w[AVG_TAT] = 0.15;
            w[AVG_WT] = 0.10;
            w[AVG_RT] = 0.05;
            w[P95_WT] = 0.02;
            w[MAX_WT] = 0.02;
            w[WT_STD] = 0.01;
            w
        }
        OptimizeMode::Responsiveness => {
            let mut w = [0.0; METRIC_COUNT];
            w[AVG_RT] = 0.30;
            w[AVG_WT] = 0.20;
            w[P95_WT] = 0.15;
            w[AVG_TAT] = 0.10;
            w[MAX_WT] = 0.10;
            w[THROUGHPUT] = 0.05;
            w[MAKESPAN] = 0.05;
            w[CPU_UTIL] = 0.03;
            w[WT_STD] = 0.02;
            w
        }
        OptimizeMode::Fairness => {
            let mut w = [0.0; METRIC_COUNT];
            w[WT_STD] = 0.25;
            w[MAX_WT] = 0.20;
            w[P95_WT] = 0.20;
            w[AVG_WT] = 0.15;
            w[AVG_RT] = 0.05;
            w[AVG_TAT] = 0.05;
            w[THROUGHPUT] = 0.04;
            w[MAKESPAN] = 0.03;
            w[CPU_UTIL] = 0.03;
            w
        }
    };

    // Workload signals nudge the base weights.
    if profile.io_ratio >= 0.6 {
        w[CPU_UTIL] += 0.05;
        w[THROUGHPUT] += 0.05;
    }
    if profile.burst_cv >= 0.8 {
        w[AVG_WT] += 0.05;
        w[P95_WT] += 0.05;
    }
    if profile.arrival_spread >= 10 {
        w[AVG_RT] += 0.05;
    }
    if profile.process_count >= 12 {
        w[MAX_WT] += 0.05;
        w[WT_STD] += 0.03;
    }

    let sum: f64 = w.iter().sum();
    for weight in &mut w {
        *weight /= sum;
    }
    w
}

/// Robust-normalizes one metric across the cohort into `[0, 1]`.
///
/// All-equal cohorts normalize to exactly 0.5.
#[must_use]
pub fn normalize_cohort(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let pct = |p: f64| -> f64 {
        let rank = (p * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    };
    let median = pct(0.5);
    let iqr = pct(0.75) - pct(0.25);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    values
        .iter()
        .map(|&v| {
            if iqr > 0.0 {
                let z = (v - median) / iqr;
                1.0 / (1.0 + (-z).exp())
            } else if max > min {
                (v - min) / (max - min)
            } else {
                0.5
            }
        })
        .collect()
}

fn rank(
    outcomes: &[PolicyOutcome],
    weights: &[f64; METRIC_COUNT],
    mode: OptimizeMode,
) -> Vec<RankedPolicy> {
    let vectors: Vec<[f64; METRIC_COUNT]> = outcomes.iter().map(metric_vector).collect();

    // Normalize metric by metric across the cohort; flip maximized metrics
    // so lower is uniformly better.
    let mut normalized = vec![[0.0f64; METRIC_COUNT]; outcomes.len()];
    for m in 0..METRIC_COUNT {
        let column: Vec<f64> = vectors.iter().map(|v| v[m]).collect();
        for (row, norm) in normalize_cohort(&column).into_iter().enumerate() {
            normalized[row][m] = if MAXIMIZE[m] { 1.0 - norm } else { norm };
        }
    }

    let mut order: Vec<usize> = (0..outcomes.len()).collect();
    let score_of = |row: usize| -> f64 {
        normalized[row]
            .iter()
            .zip(weights.iter())
            .map(|(n, w)| n * w)
            .sum()
    };
    order.sort_by(|&a, &b| {
        score_of(a)
            .partial_cmp(&score_of(b))
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(mode, &outcomes[a], &outcomes[b]))
    });
    order
        .into_iter()
        .map(|row| RankedPolicy {
            policy: outcomes[row].policy,
            score: score_of(row),
        })
        .collect()
}

fn tie_break(mode: OptimizeMode, a: &PolicyOutcome, b: &PolicyOutcome) -> Ordering {
    let f = |x: f64, y: f64| x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    match mode {
        OptimizeMode::Throughput => f(b.metrics.throughput, a.metrics.throughput)
            .then(a.metrics.makespan.cmp(&b.metrics.makespan))
            .then(f(a.metrics.avg_wait, b.metrics.avg_wait)),
        OptimizeMode::Responsiveness => f(a.metrics.avg_response, b.metrics.avg_response)
            .then(f(a.metrics.avg_wait, b.metrics.avg_wait))
            .then(a.fairness.p95_wait.cmp(&b.fairness.p95_wait)),
        OptimizeMode::Fairness => a
            .fairness
            .max_wait
            .cmp(&b.fairness.max_wait)
            .then(f(a.fairness.wait_stddev, b.fairness.wait_stddev))
            .then(f(a.metrics.avg_wait, b.metrics.avg_wait)),
    }
}

fn confidence(ranking: &[RankedPolicy]) -> Confidence {
    let (Some(first), Some(second)) = (ranking.first(), ranking.get(1)) else {
        return Confidence::High;
    };
    let gap = (second.score - first.score) / second.score.abs().max(1e-9);
    if gap >= HIGH_GAP {
        Confidence::High
    } else if gap >= MEDIUM_GAP {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_config::QueueClass;

    fn spec(pid: &str, arrival: u64, bursts: &[u64]) -> ProcessSpec {
        ProcessSpec {
            pid: pid.to_owned(),
            arrival,
            priority: 0,
            queue: QueueClass::User,
            bursts: bursts.to_vec(),
            memory: None,
        }
    }

    #[test]
    fn equal_inputs_normalize_to_half() {
        let norm = normalize_cohort(&[4.0, 4.0, 4.0, 4.0]);
        assert!(norm.iter().all(|&n| (n - 0.5).abs() < 1e-12));
    }

    #[test]
    fn zero_iqr_falls_back_to_min_max() {
        // Median and quartiles all land on 2.0, but the cohort is not
        // constant, so min-max takes over.
        let norm = normalize_cohort(&[2.0, 2.0, 2.0, 2.0, 10.0]);
        assert!((norm[0] - 0.0).abs() < 1e-12);
        assert!((norm[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn p95_is_nearest_rank() {
        let waits: Vec<u64> = (1..=20).collect();
        let stats = fairness(&waits);
        // ceil(0.95 * 20) = 19 -> the 19th smallest value.
        assert_eq!(stats.p95_wait, 19);
        assert_eq!(stats.max_wait, 20);
    }

    #[test]
    fn starvation_flags_outliers() {
        let starved = fairness(&[0, 1, 1, 2, 40]);
        assert!(starved.starvation);
        let fine = fairness(&[3, 4, 5]);
        assert!(!fine.starvation);
    }

    #[test]
    fn dominated_policy_stays_off_the_front() {
        let better = PolicyOutcome {
            policy: SchedPolicy::Sjf,
            completed: true,
            metrics: Metrics {
                avg_wait: 1.0,
                avg_turnaround: 4.0,
                avg_response: 1.0,
                cpu_util: 100.0,
                makespan: 9,
                throughput: 0.33,
            },
            fairness: fairness(&[0, 1, 2]),
            waits: vec![0, 1, 2],
        };
        let mut worse = better.clone();
        worse.policy = SchedPolicy::Fcfs;
        worse.metrics.avg_wait = 3.0;
        worse.fairness = fairness(&[2, 3, 4]);

        let front = pareto_front(&[better, worse]);
        assert_eq!(front, vec![SchedPolicy::Sjf]);
    }

    #[test]
    fn compares_all_policies_on_a_small_workload() {
        let workload = vec![
            spec("P1", 0, &[5]),
            spec("P2", 1, &[3]),
            spec("P3", 2, &[1]),
        ];
        let report = compare(&workload, &SimConfig::default(), OptimizeMode::Responsiveness)
            .expect("comparison runs");
        assert_eq!(report.outcomes.len(), SchedPolicy::ALL.len());
        assert!(report.outcomes.iter().all(|o| o.completed));
        assert_eq!(report.ranking.len(), SchedPolicy::ALL.len());
        assert!(!report.pareto_front.is_empty());
        assert_eq!(report.best, report.ranking[0].policy);
        // On this workload SJF minimizes waiting, so it must not be
        // dominated.
        assert!(report.pareto_front.contains(&SchedPolicy::Sjf));
    }

    #[test]
    fn empty_workload_is_rejected() {
        assert!(matches!(
            compare(&[], &SimConfig::default(), OptimizeMode::Fairness),
            Err(Error::EmptyWorkload)
        ));
    }

    #[test]
    fn weights_are_normalized_and_signal_shifted() {
        let calm = profile(&[spec("P1", 0, &[4]), spec("P2", 0, &[4])]);
        let w = weights(OptimizeMode::Throughput, &calm);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let spread = WorkloadProfile {
            io_ratio: 0.7,
            burst_cv: 1.0,
            arrival_spread: 20,
            process_count: 16,
        };
        let shifted = weights(OptimizeMode::Throughput, &spread);
        assert!((shifted.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        // The I/O-heavy signal boosts utilization relative to the base.
        assert!(shifted[CPU_UTIL] > w[CPU_UTIL] * 0.9);
    }
}
