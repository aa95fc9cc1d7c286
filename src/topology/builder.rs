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
use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::UnGraph;

use super::{Graph, Link, LinkClass, LinkParams, Node, NodeId, NodeKind, TopologyError};

/// Incrementally describes a topology, rejecting invalid references as soon as they are added.
///
/// Calling [`TopologyBuilder::build`] produces an independent snapshot. Adding more nodes or links
/// to the builder afterwards does not change graphs that were already built.
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    links: Vec<Link>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Fails if a node with the same `id` already exists.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        kind: NodeKind,
        name: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<&Node, TopologyError> {
        let id = id.into();
        let name = name.into();
        if let Some(existing) = self.index.get(&id) {
            return Err(TopologyError::DuplicateNode {
                id,
                existing: self.nodes[*existing].name.clone(),
                name,
            });
        }
        log::trace!("add {kind} {name} ({id})");
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Node {
            id,
            kind,
            name,
            attributes,
        });
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    /// Add a switch without any attributes.
    pub fn add_switch(
        &mut self,
        id: impl Into<NodeId>,
        name: impl Into<String>,
    ) -> Result<&Node, TopologyError> {
        self.add_node(id, NodeKind::Switch, name, BTreeMap::new())
    }

    /// Add a host without any attributes.
    pub fn add_host(
        &mut self,
        id: impl Into<NodeId>,
        name: impl Into<String>,
    ) -> Result<&Node, TopologyError> {
        self.add_node(id, NodeKind::Host, name, BTreeMap::new())
    }

    /// Add an undirected link between two existing nodes. The class of the link is derived from
    /// the kinds of its endpoints. Fails if the bandwidth is set but not a positive number.
    pub fn add_link(
        &mut self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
        params: LinkParams,
    ) -> Result<&Link, TopologyError> {
        let (a, b) = (a.into(), b.into());
        let kind = |id: NodeId| {
            self.node(id)
                .map(|n| n.kind)
                .ok_or(TopologyError::UnknownNode { missing: id, a, b })
        };
        let class = LinkClass::between(kind(a)?, kind(b)?);
        let link = Link {
            a,
            b,
            class,
            params,
        };
        check_params(&link)?;
        log::trace!("add {class} link {link} ({params:?})");
        self.links.push(link);
        Ok(&self.links[self.links.len() - 1])
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|i| &self.nodes[*i])
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Validate the topology and create an immutable snapshot of it.
    ///
    /// The graph is rejected if a link references a node that does not exist, if a node id or a
    /// node name is used twice, if a link connects a node to itself, if two links of the same
    /// class connect the same pair of nodes, or if a link has an invalid bandwidth.
    pub fn build(&self) -> Result<Graph, TopologyError> {
        let mut g = UnGraph::with_capacity(self.nodes.len(), self.links.len());
        let mut ids = HashMap::with_capacity(self.nodes.len());
        let mut names = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let idx = g.add_node(node.clone());
            if ids.insert(node.id, idx).is_some() {
                return Err(TopologyError::InvalidTopology(format!(
                    "node id {} is used more than once",
                    node.id
                )));
            }
            if names.insert(node.name.clone(), idx).is_some() {
                return Err(TopologyError::InvalidTopology(format!(
                    "node name {} is used more than once",
                    node.name
                )));
            }
        }

        let mut seen = HashSet::with_capacity(self.links.len());
        for link in &self.links {
            let (Some(a), Some(b)) = (ids.get(&link.a), ids.get(&link.b)) else {
                return Err(TopologyError::InvalidTopology(format!(
                    "link {link} references a node that does not exist"
                )));
            };
            check_params(link)?;
            if a == b {
                return Err(TopologyError::InvalidTopology(format!(
                    "link {link} connects {} to itself",
                    g[*a].name
                )));
            }
            if !seen.insert((link.class, link.endpoints())) {
                return Err(TopologyError::InvalidTopology(format!(
                    "parallel {} link between {} and {}",
                    link.class, g[*a].name, g[*b].name
                )));
            }
            g.add_edge(*a, *b, link.clone());
        }

        log::debug!(
            "built topology with {} nodes and {} links",
            g.node_count(),
            g.edge_count()
        );

        Ok(Graph { g, ids, names })
    }
}

/// Bandwidths must be finite and positive. Delays cannot be negative by construction.
fn check_params(link: &Link) -> Result<(), TopologyError> {
    match link.params.bandwidth {
        Some(bw) if !bw.is_finite() || bw <= 0.0 => Err(TopologyError::InvalidTopology(format!(
            "link {link} has an invalid bandwidth of {bw} Mbps"
        ))),
        _ => Ok(()),
    }
}
