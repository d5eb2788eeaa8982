use std::io::{self, BufRead, Write};

use itertools::Itertools;
use structopt::StructOpt;

use schedsim::binding::Pacing;
use schedsim::config::SimConfig;
use schedsim::metrics::Report;
use schedsim::policies::PolicyKind;
use schedsim::store::{BatchId, Store};
use schedsim::utils::prelude::*;
use schedsim::RunOptions;

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

fn open_store() -> Result<Store> {
    let cfg = SimConfig::fetch()?;
    Ok(Store::open(cfg.store.path))
}

/// Free-text prompt loop collecting jobs until an empty command
#[derive(StructOpt)]
pub struct Submit {}

impl Cmd for Submit {
    fn run(self) -> Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        let mut entries: Vec<(String, u64, u64)> = Vec::new();

        loop {
            let command = match prompt(&mut lines, "command (empty to finish): ")? {
                Some(line) if !line.is_empty() => line,
                _ => break,
            };
            let arrival = prompt_number(&mut lines, "arrival time, seconds: ")?;
            let estimate = prompt_number(&mut lines, "service estimate, seconds: ")?;
            entries.push((command, arrival, estimate));
        }

        if entries.is_empty() {
            println!("nothing submitted");
            return Ok(());
        }

        let id = schedsim::submit_batch(entries)?;
        println!("saved batch {}", id);
        Ok(())
    }
}

fn prompt(lines: &mut impl Iterator<Item = io::Result<String>>, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_owned())),
        None => Ok(None),
    }
}

fn prompt_number(lines: &mut impl Iterator<Item = io::Result<String>>, text: &str) -> Result<u64> {
    loop {
        match prompt(lines, text)? {
            Some(line) => match line.parse() {
                Ok(n) => return Ok(n),
                Err(_) => println!("not a non-negative integer: {:?}", line),
            },
            None => {
                return Err(Error::InvalidJob {
                    command: String::new(),
                    reason: "input ended mid-job".into(),
                })
            }
        }
    }
}

/// List saved batches
#[derive(StructOpt)]
pub struct Batches {}

impl Cmd for Batches {
    fn run(self) -> Result<()> {
        let batches = open_store()?.load_batches()?;
        if batches.is_empty() {
            println!("no saved batches");
            return Ok(());
        }
        for batch in batches {
            println!(
                "{}  submitted {}  {} job(s)",
                batch.id,
                batch.submitted.format("%Y-%m-%d %H:%M:%S"),
                batch.jobs.len()
            );
            for job in &batch.jobs {
                println!(
                    "    {}  {:?}  arrival {}  estimate {}",
                    job.id, job.command, job.arrival, job.estimate
                );
            }
        }
        Ok(())
    }
}

/// Run one saved batch under one policy
#[derive(StructOpt)]
pub struct Run {
    /// Batch number as shown by `batches`
    batch: u32,
    /// One of: fcfs, rr, spn, srt, hrrn
    policy: String,
    /// Sleep in real time so unit states mirror the simulated timeline
    #[structopt(long)]
    realtime: bool,
    /// Round Robin only: drive each job from its own worker thread
    #[structopt(long)]
    workers: bool,
}

impl Cmd for Run {
    fn run(self) -> Result<()> {
        let opts = RunOptions {
            pacing: if self.realtime { Some(Pacing::RealTime) } else { None },
            per_job_workers: if self.workers { Some(true) } else { None },
        };
        let report = schedsim::run_batch(BatchId(self.batch), &self.policy, opts)?;
        print_report(BatchId(self.batch), &report);
        Ok(())
    }
}

fn print_report(batch: BatchId, report: &Report) {
    println!("{} under {} ({})", batch, report.policy, report.policy.description());
    println!("{:>6} {:>8} {:>12} {:>8}", "job", "finish", "turnaround", "wait");
    for m in &report.jobs {
        println!("{:>6} {:>8} {:>12} {:>8}", m.job.to_string(), m.finish.0, m.turnaround.0, m.response.0);
    }
    println!(
        "avg turnaround {:.2}  avg wait {:.2}",
        report.avg_turnaround, report.avg_response
    );
}

/// List past run summaries, most recent last
#[derive(StructOpt)]
pub struct Runs {}

impl Cmd for Runs {
    fn run(self) -> Result<()> {
        let batches = open_store()?.load_batches()?;
        let runs = batches
            .iter()
            .flat_map(|b| b.runs.iter().map(move |r| (b.id, r)))
            .sorted_by_key(|(_, r)| r.at)
            .collect_vec();

        if runs.is_empty() {
            println!("no runs recorded");
            return Ok(());
        }
        for (batch, run) in runs {
            println!(
                "{}  {}  {:<4}  avg turnaround {:.2}  avg wait {:.2}",
                run.at.format("%Y-%m-%d %H:%M:%S"),
                batch,
                run.policy.to_string(),
                run.avg_turnaround,
                run.avg_response
            );
        }
        Ok(())
    }
}

/// Show the effective configuration and the recognized policies
#[derive(StructOpt)]
pub struct ShowConfig {}

impl Cmd for ShowConfig {
    fn run(self) -> Result<()> {
        let cfg = SimConfig::fetch()?;
        println!("{:#?}", cfg);
        println!("policies:");
        for kind in PolicyKind::ALL.iter() {
            println!("  {:<4} {}", kind.to_string(), kind.description());
        }
        Ok(())
    }
}

/// Drop all saved state
#[derive(StructOpt)]
pub struct Clear {}

impl Cmd for Clear {
    fn run(self) -> Result<()> {
        open_store()?.clear()?;
        info!("saved state cleared");
        println!("saved state cleared");
        Ok(())
    }
}
