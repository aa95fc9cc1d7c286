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
//! Topology model handed to the emulation runtime.
//!
//! A [`Graph`] is created through a [`TopologyBuilder`], which validates every node and link as it
//! is added, and validates the complete topology again in [`TopologyBuilder::build`]. Once built,
//! the graph is immutable.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    net::Ipv4Addr,
    time::Duration,
};

use ipnet::Ipv4Net;
use itertools::Itertools;
use mac_address::MacAddress;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

mod builder;
mod error;
mod export;

pub use builder::TopologyBuilder;
pub use error::TopologyError;
pub use export::{RuntimeLink, RuntimeNode, RuntimeTopology};

/// Well-known keys of the node attribute mapping.
pub mod attr {
    /// Host address including the prefix length, e.g., `10.0.3.1/24`.
    pub const IP: &str = "ip";
    /// Host MAC address, e.g., `00:00:00:00:00:03`.
    pub const MAC: &str = "mac";
    /// Protocol version hint for switches, e.g., `OpenFlow13`.
    pub const PROTOCOLS: &str = "protocols";
    /// Human-readable label of the site the node belongs to.
    pub const SITE: &str = "site";
}

/// Identifier of a node, unique within a graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    /// Forwarding element.
    Switch,
    /// Traffic endpoint.
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    pub fn is_switch(&self) -> bool {
        self.kind == NodeKind::Switch
    }

    pub fn is_host(&self) -> bool {
        self.kind == NodeKind::Host
    }

    /// Get an attribute of the node
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Address of the node, if the `ip` attribute is set and valid.
    pub fn ip(&self) -> Option<Ipv4Net> {
        self.attr(attr::IP)?.parse().ok()
    }

    /// MAC address of the node, if the `mac` attribute is set and valid.
    pub fn mac(&self) -> Option<MacAddress> {
        self.attr(attr::MAC)?.parse().ok()
    }
}

/// Class of a link, used to select the default link parameters.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
pub enum LinkClass {
    /// Link attaching a host to the network.
    Access,
    /// Link between two switches.
    Backbone,
}

impl LinkClass {
    pub fn between(a: NodeKind, b: NodeKind) -> Self {
        match (a, b) {
            (NodeKind::Switch, NodeKind::Switch) => Self::Backbone,
            _ => Self::Access,
        }
    }
}

/// Optional link properties. Unset properties are left to the emulation runtime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkParams {
    /// Bandwidth in Mbps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<f64>,
    /// One-way propagation delay, written in milliseconds.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "lab_utils::serde::millis::in_option"
    )]
    pub delay: Option<Duration>,
}

impl LinkParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder API: set the bandwidth in Mbps.
    pub fn bandwidth(mut self, mbps: f64) -> Self {
        self.bandwidth = Some(mbps);
        self
    }

    /// Builder API: set the delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Merge two sets of parameters. Values set in `self` take precedence over `fallback`.
    pub fn or(&self, fallback: &LinkParams) -> LinkParams {
        LinkParams {
            bandwidth: self.bandwidth.or(fallback.bandwidth),
            delay: self.delay.or(fallback.delay),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bandwidth.is_none() && self.delay.is_none()
    }
}

/// Undirected link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub class: LinkClass,
    #[serde(default)]
    pub params: LinkParams,
}

impl Link {
    /// Endpoints of the link in a canonical order, independent of the direction it was added in.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    /// Check whether the link is attached to `id`.
    pub fn touches(&self, id: NodeId) -> bool {
        self.a == id || self.b == id
    }

    /// Return the other endpoint of the link, seen from `id`.
    pub fn peer(&self, id: NodeId) -> Option<NodeId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.a, self.b)
    }
}

/// Interface of a node, numbered in the order in which its links were added (starting at 1).
#[derive(Debug, Clone, Copy)]
pub struct Port<'a> {
    pub number: usize,
    pub peer: &'a Node,
    pub link: &'a Link,
}

/// Immutable, validated topology.
#[derive(Debug, Clone)]
pub struct Graph {
    g: UnGraph<Node, Link>,
    ids: HashMap<NodeId, NodeIndex>,
    names: HashMap<String, NodeIndex>,
}

impl Graph {
    pub fn num_nodes(&self) -> usize {
        self.g.node_count()
    }

    pub fn num_links(&self) -> usize {
        self.g.edge_count()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.ids.get(&id).map(|idx| &self.g[*idx])
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.names.get(name).map(|idx| &self.g[*idx])
    }

    /// Find the node that owns the address `ip`.
    pub fn node_by_ip(&self, ip: Ipv4Addr) -> Option<&Node> {
        self.nodes().find(|n| n.ip().is_some_and(|net| net.addr() == ip))
    }

    /// All nodes in the order they were added.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.g.node_weights()
    }

    /// All links in the order they were added.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.g.edge_weights()
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_switch())
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_host())
    }

    pub fn links_of(&self, class: LinkClass) -> impl Iterator<Item = &Link> {
        self.links().filter(move |l| l.class == class)
    }

    /// Get the link between `a` and `b` (in any direction).
    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        let (a, b) = (self.ids.get(&a)?, self.ids.get(&b)?);
        self.g.find_edge(*a, *b).map(|e| &self.g[e])
    }

    /// Neighbors of a node, sorted by their id. Returns `None` if the node does not exist.
    pub fn neighbors(&self, id: NodeId) -> Option<Vec<&Node>> {
        let idx = self.ids.get(&id)?;
        Some(
            self.g
                .neighbors(*idx)
                .map(|n| &self.g[n])
                .sorted_by_key(|n| n.id)
                .collect(),
        )
    }

    /// Ports of a node, numbered in link insertion order. Returns `None` if the node does not
    /// exist.
    pub fn ports(&self, id: NodeId) -> Option<Vec<Port<'_>>> {
        self.ids.get(&id)?;
        Some(
            self.links()
                .filter_map(|link| {
                    let peer = self.node(link.peer(id)?)?;
                    Some((peer, link))
                })
                .enumerate()
                .map(|(i, (peer, link))| Port {
                    number: i + 1,
                    peer,
                    link,
                })
                .collect(),
        )
    }
}
