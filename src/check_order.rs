// abilene-lab: Backbone Topology Construction and Arrival-Order Analysis for Network Emulation
// Copyright (C) 2024-2025 The abilene-lab authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;

use abilene_lab::{
    arrivals::{
        scan, ArrivalError, ArrivalReader, Malformed, OrderSummary, OutOfOrderEvent, Reference,
    },
    records::EventWriter,
    util,
};

/// Check captured arrival logs (`<frame> <timestamp> ...` per line) for reordered frames.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Arrival logs to check. Files ending in `.gz` are decompressed on the fly.
    #[arg(required = true)]
    logs: Vec<PathBuf>,
    /// Value each timestamp is compared against.
    #[arg(short, long, value_enum, default_value_t = Reference::RunningMax)]
    reference: Reference,
    /// Abort a log at the first timestamp that cannot be parsed, instead of skipping the line.
    #[arg(long)]
    strict: bool,
    /// Also write all out-of-order frames to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Only print the summary of each log.
    #[arg(short, long)]
    quiet: bool,
}

/// Destination of the out-of-order events, shared by all logs that are checked.
struct Report {
    quiet: bool,
    prefix: bool,
    csv: Option<EventWriter<File>>,
    csv_error: Option<csv::Error>,
}

impl Report {
    fn event(&mut self, source: &str, event: &OutOfOrderEvent) {
        if !self.quiet {
            if self.prefix {
                println!("{source}: {event}");
            } else {
                println!("{event}");
            }
        }
        if self.csv_error.is_some() {
            return;
        }
        if let Some(csv) = &mut self.csv {
            if let Err(e) = csv.write_event(source, event) {
                self.csv_error = Some(e);
            }
        }
    }
}

fn check_log(
    path: &Path,
    args: &Args,
    on_event: impl FnMut(OutOfOrderEvent),
) -> Result<OrderSummary, ArrivalError> {
    let on_malformed = if args.strict {
        Malformed::Fail
    } else {
        Malformed::Skip
    };
    let reader = ArrivalReader::open(path)?.on_malformed(on_malformed);
    scan(reader, args.reference, on_event)
}

fn main() -> Result<()> {
    util::init_logging();
    let args = Args::parse();

    let logs = util::human_sorted(args.logs.clone());
    let csv = match &args.csv {
        Some(path) => {
            Some(EventWriter::create(path).with_context(|| format!("Cannot create {path:?}"))?)
        }
        None => None,
    };
    let report = Mutex::new(Report {
        quiet: args.quiet,
        prefix: logs.len() > 1,
        csv,
        csv_error: None,
    });

    // logs are checked in parallel. Events are reported as soon as they are found (prefixed by
    // their log if there are several), summaries are reported in order.
    let outcomes = logs
        .par_iter()
        .map(|path| {
            let source = util::display_name(path);
            let summary = check_log(path, &args, |e| {
                report
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .event(&source, &e)
            });
            (source, summary)
        })
        .collect::<Vec<_>>();

    let mut failed = 0;
    for (source, outcome) in outcomes {
        match outcome {
            Ok(summary) => log::info!("{source}: {summary}"),
            Err(e) => {
                log::error!("{source}: {e}");
                failed += 1;
            }
        }
    }

    let mut report = report.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let (Some(path), Some(csv)) = (&args.csv, &mut report.csv) {
        if let Some(e) = report.csv_error.take() {
            return Err(e).with_context(|| format!("Cannot write {path:?}"));
        }
        csv.flush().with_context(|| format!("Cannot write {path:?}"))?;
        log::info!("Out-of-order frames written to {path:?}");
    }

    if failed > 0 {
        bail!("{failed} of {} logs could not be checked", logs.len());
    }
    Ok(())
}
