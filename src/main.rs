// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end for the scheduling simulator.
//!
//! `schedsim run` drives one workload under a chosen policy through a
//! session and prints the final state; `schedsim compare` replays the
//! workload under every policy and prints the comparison report. The
//! streaming session surface (subscribe + control messages) is what real
//! front ends attach to; this binary is the reference driver.

#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand, ValueEnum};
use schedsim_analytics::{OptimizeMode, compare};
use schedsim_config::{ProcessSpec, SchedPolicy, SimConfig};
use schedsim_engine::StateSnapshot;
use schedsim_session::{Command, InitArgs, spawn};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "schedsim", version, about = "Interactive OS scheduling simulator")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run a workload to completion under one policy.
    Run {
        /// JSON workload file: an array of process descriptors.
        #[arg(long)]
        workload: PathBuf,
        /// Scheduling policy.
        #[arg(long, value_enum, default_value_t = PolicyArg::Fcfs)]
        policy: PolicyArg,
        /// Time quantum for RR/MLQ.
        #[arg(long)]
        quantum: Option<u64>,
        /// Maximum ticks before giving up.
        #[arg(long, default_value_t = 10_000)]
        ticks: u64,
        /// Print the full state snapshot as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Compare every policy over a workload.
    Compare {
        /// JSON workload file: an array of process descriptors.
        #[arg(long)]
        workload: PathBuf,
        /// Optimization mode for the weighted ranking.
        #[arg(long, value_enum, default_value_t = ModeArg::Responsiveness)]
        mode: ModeArg,
        /// Print the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Fcfs,
    Sjf,
    PriorityNp,
    PriorityP,
    Rr,
    Mlq,
}

impl From<PolicyArg> for SchedPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Fcfs => SchedPolicy::Fcfs,
            PolicyArg::Sjf => SchedPolicy::Sjf,
            PolicyArg::PriorityNp => SchedPolicy::PriorityNp,
            PolicyArg::PriorityP => SchedPolicy::PriorityP,
            PolicyArg::Rr => SchedPolicy::Rr,
            PolicyArg::Mlq => SchedPolicy::Mlq,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Throughput,
    Responsiveness,
    Fairness,
}

impl From<ModeArg> for OptimizeMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Throughput => OptimizeMode::Throughput,
            ModeArg::Responsiveness => OptimizeMode::Responsiveness,
            ModeArg::Fairness => OptimizeMode::Fairness,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Cmd::Run {
            workload,
            policy,
            quantum,
            ticks,
            json,
        } => run(&workload, policy.into(), quantum, ticks, json).await,
        Cmd::Compare {
            workload,
            mode,
            json,
        } => run_compare(&workload, mode.into(), json),
    }
}

async fn run(
    workload: &Path,
    policy: SchedPolicy,
    quantum: Option<u64>,
    ticks: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let processes = load_workload(workload)?;
    let session = spawn();
    session
        .execute(Command::Init(InitArgs {
            policy,
            tick_ms: None,
            quantum,
            memory_mode: None,
            frames: None,
            mem_algo: None,
            page_size: None,
            fault_penalty: None,
            processes,
        }))
        .await?;
    session.execute(Command::Run { steps: ticks }).await?;

    let snapshot = session.snapshot().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_summary(&snapshot);
    }
    Ok(())
}

fn run_compare(
    workload: &Path,
    mode: OptimizeMode,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let processes = load_workload(workload)?;
    let report = compare(&processes, &SimConfig::default(), mode)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("mode: {}  best: {}  confidence: {:?}", report.mode, report.best, report.confidence);
    println!(
        "pareto front: {}",
        report
            .pareto_front
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("{:<14} {:>8}  {:>8} {:>8} {:>8} {:>9} {:>7}", "policy", "score", "avg_wt", "avg_tat", "avg_rt", "makespan", "util%");
    for ranked in &report.ranking {
        let outcome = report
            .outcomes
            .iter()
            .find(|o| o.policy == ranked.policy)
            .expect("ranked policies come from the outcome set");
        let m = &outcome.metrics;
        println!(
            "{:<14} {:>8.4}  {:>8.2} {:>8.2} {:>8.2} {:>9} {:>7.1}",
            ranked.policy.to_string(),
            ranked.score,
            m.avg_wait,
            m.avg_turnaround,
            m.avg_response,
            m.makespan,
            m.cpu_util
        );
    }
    Ok(())
}

fn load_workload(path: &Path) -> Result<Vec<ProcessSpec>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_summary(snapshot: &StateSnapshot) {
    println!(
        "policy: {}  time: {}  completed: {}/{}",
        snapshot.algorithm,
        snapshot.time,
        snapshot.completed.len(),
        snapshot.processes.len()
    );
    println!("gantt: {}", snapshot.gantt.join(" "));
    if snapshot.io_gantt.iter().any(|t| t != "IDLE") {
        println!("io:    {}", snapshot.io_gantt.join(" "));
    }
    println!();
    println!(
        "{:<8} {:>8} {:>6} {:>12} {:>10} {:>11}",
        "pid", "arrival", "wait", "turnaround", "response", "completion"
    );
    for p in &snapshot.per_process {
        println!(
            "{:<8} {:>8} {:>6} {:>12} {:>10} {:>11}",
            p.pid,
            p.arrival,
            p.wait,
            fmt_opt(p.turnaround),
            fmt_opt(p.response),
            fmt_opt(p.completion)
        );
    }
    let m = &snapshot.metrics;
    println!();
    println!(
        "avg wait {:.2}  avg turnaround {:.2}  avg response {:.2}  cpu {:.1}%  makespan {}  throughput {:.3}",
        m.avg_wait, m.avg_turnaround, m.avg_response, m.cpu_util, m.makespan, m.throughput
    );
}

fn fmt_opt(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}
