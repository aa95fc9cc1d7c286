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
//! Hand-off format for the emulation runtime.
//!
//! The runtime only needs names, kinds, attributes, and link parameters. Delays are rendered the
//! way traffic-control tools expect them, e.g., `"2ms"` or `"250us"`.

use std::{collections::BTreeMap, fs::OpenOptions, io::Write, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use super::{Graph, NodeId, NodeKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeTopology {
    pub nodes: Vec<RuntimeNode>,
    pub links: Vec<RuntimeLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeNode {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeLink {
    pub node1: String,
    pub node2: String,
    /// Bandwidth in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
}

/// Render a delay with the coarsest unit that represents it exactly.
pub fn format_delay(delay: Duration) -> String {
    let nanos = delay.as_nanos();
    if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}

impl Graph {
    /// Describe the graph in the format expected by the emulation runtime.
    pub fn to_runtime(&self) -> RuntimeTopology {
        let name = |id: NodeId| {
            self.node(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        RuntimeTopology {
            nodes: self
                .nodes()
                .map(|n| RuntimeNode {
                    name: n.name.clone(),
                    kind: n.kind,
                    params: n.attributes.clone(),
                })
                .collect(),
            links: self
                .links()
                .map(|l| RuntimeLink {
                    node1: name(l.a),
                    node2: name(l.b),
                    bw: l.params.bandwidth,
                    delay: l.params.delay.map(format_delay),
                })
                .collect(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_runtime())
    }

    /// Write the runtime description to `path`, overwriting any existing file.
    pub fn write_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let serialized = self.to_json_string()?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::topology::{LinkParams, TopologyBuilder};

    #[test]
    fn delays() {
        assert_eq!(format_delay(Duration::from_millis(2)), "2ms");
        assert_eq!(format_delay(Duration::from_micros(1500)), "1500us");
        assert_eq!(format_delay(Duration::from_nanos(7)), "7ns");
        assert_eq!(format_delay(Duration::ZERO), "0ms");
    }

    #[test]
    fn runtime_document() {
        let mut b = TopologyBuilder::new();
        b.add_switch(0, "s0").unwrap();
        b.add_host(256, "h0").unwrap();
        b.add_link(
            256,
            0,
            LinkParams::new()
                .bandwidth(100.0)
                .delay(Duration::from_millis(1)),
        )
        .unwrap();
        let runtime = b.build().unwrap().to_runtime();

        assert_eq!(runtime.nodes.len(), 2);
        assert_eq!(runtime.nodes[1].kind, NodeKind::Host);
        assert_eq!(
            runtime.links,
            vec![RuntimeLink {
                node1: "h0".to_string(),
                node2: "s0".to_string(),
                bw: Some(100.0),
                delay: Some("1ms".to_string()),
            }]
        );

        let json: serde_json::Value = serde_json::to_value(&runtime).unwrap();
        assert_eq!(json["nodes"][0]["kind"], "switch");
        assert_eq!(json["links"][0]["delay"], "1ms");
    }

    #[test]
    fn unset_parameters_are_omitted() {
        let mut b = TopologyBuilder::new();
        b.add_switch(0, "s0").unwrap();
        b.add_switch(1, "s1").unwrap();
        b.add_link(0, 1, LinkParams::new()).unwrap();
        let json = b.build().unwrap().to_json_string().unwrap();
        assert!(!json.contains("bw"));
        assert!(!json.contains("delay"));
    }
}
