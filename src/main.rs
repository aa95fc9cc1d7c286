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
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use abilene_lab::{
    backbone::{build_backbone, BackboneConfig, BackboneTables, Preset},
    topology::{Graph, LinkClass},
    util::{self, PathBufExt},
};
use lab_utils::other::file_timestamp;

/// Build the backbone topology and export it for the emulation runtime.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Link parameter preset.
    #[arg(short, long, value_enum, default_value_t = Preset::Delay)]
    preset: Preset,
    /// Read link parameters and node metadata from a JSON file instead of using a preset.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Read the node and edge tables from a JSON file instead of using the built-in backbone.
    #[arg(short, long)]
    tables: Option<PathBuf>,
    /// Write the topology to this file. If it is a directory, a timestamped file is created in it.
    /// Without this option, the topology is printed to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Log the interfaces of every switch.
    #[arg(long)]
    ports: bool,
}

fn log_ports(graph: &Graph) {
    for switch in graph.switches() {
        log::info!("Interfaces for {}:", switch.name);
        for port in graph.ports(switch.id).unwrap_or_default() {
            log::info!(
                "  {}-eth{} (Port {}) connected to {}",
                switch.name,
                port.number,
                port.number,
                port.peer.name
            );
        }
    }
}

fn main() -> Result<()> {
    util::init_logging();
    let args = Args::parse();

    let tables = match &args.tables {
        Some(path) => BackboneTables::from_file(path)?,
        None => BackboneTables::abilene(),
    };
    let (variant, config) = match &args.config {
        Some(path) => (
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "custom".to_string()),
            BackboneConfig::from_file(path)?,
        ),
        None => (args.preset.to_string().to_lowercase(), args.preset.config()),
    };

    let graph = build_backbone(&tables, &config).context("Cannot build the backbone")?;
    log::info!(
        "Built {variant} backbone: {} switches, {} hosts, {} access links, {} backbone links",
        graph.switches().count(),
        graph.hosts().count(),
        graph.links_of(LinkClass::Access).count(),
        graph.links_of(LinkClass::Backbone).count(),
    );

    if args.ports {
        log_ports(&graph);
    }

    match args.output {
        None => println!("{}", graph.to_json_string()?),
        Some(path) => {
            let path = if path.is_dir() {
                path.then(format!("{variant}_{}.json", file_timestamp()?))
            } else {
                path
            };
            graph
                .write_json(&path)
                .with_context(|| format!("Cannot write {path:?}"))?;
            log::info!("Topology written to {path:?}");
        }
    }

    Ok(())
}
