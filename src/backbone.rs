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
//! The research backbone used for the emulation experiments, described as data.
//!
//! The topology is given by two tables: the sites (one switch with one attached host each) and
//! the edges between the switches of two sites. Link parameters are not part of the tables, they
//! are taken from a [`BackboneConfig`], which holds the defaults for each link class and
//! individual overrides. The variants used in past experiments are available as [`Preset`]s.

use std::{
    collections::{BTreeMap, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum::IntoEnumIterator;

use lab_utils::addressing;

use crate::topology::{attr, Graph, LinkParams, NodeId, NodeKind, TopologyBuilder, TopologyError};

/// Node ids of hosts are offset by this value from the site id (which is used for the switch).
pub const HOST_ID_OFFSET: u32 = addressing::MAX_SITE_ID + 1;

/// Bandwidth of an OC-192 backbone link, in Mbps.
pub const OC192_BW: f64 = 10_000.0;
/// Bandwidth of a host link in the OC-192 variant, in Mbps.
pub const HOST_LINK_BW: f64 = 1_000.0;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
/// Sites (points of presence) of the backbone, in the order of their ids.
pub enum Site {
    NewYork,
    Chicago,
    WashingtonDC,
    Seattle,
    Sunnyvale,
    LosAngeles,
    Denver,
    KansasCity,
    Houston,
    Atlanta,
    Indianapolis,
}

impl Site {
    pub fn id(&self) -> u32 {
        *self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::iter().find(|s| s.id() == id)
    }
}

/// Links between the sites of the backbone.
const BACKBONE_EDGES: [(Site, Site); 14] = [
    (Site::NewYork, Site::Chicago),
    (Site::NewYork, Site::WashingtonDC),
    (Site::Chicago, Site::Indianapolis),
    (Site::WashingtonDC, Site::Atlanta),
    (Site::Seattle, Site::Sunnyvale),
    (Site::Seattle, Site::Denver),
    (Site::Sunnyvale, Site::LosAngeles),
    (Site::Sunnyvale, Site::Denver),
    (Site::LosAngeles, Site::Houston),
    (Site::Denver, Site::KansasCity),
    (Site::KansasCity, Site::Houston),
    (Site::KansasCity, Site::Indianapolis),
    (Site::Houston, Site::Atlanta),
    (Site::Atlanta, Site::Indianapolis),
];

/// Switch node id of a site.
pub fn switch_id(site: u32) -> NodeId {
    NodeId(site)
}

/// Host node id of a site.
pub fn host_id(site: u32) -> NodeId {
    NodeId(HOST_ID_OFFSET + site)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref().to_path_buf();
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::Json { path, source })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: u32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub source: u32,
    pub target: u32,
}

/// Shape of the topology: one entry per site and one entry per switch-to-switch link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneTables {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<EdgeEntry>,
}

impl BackboneTables {
    /// The 11 sites and 14 links of the Abilene backbone.
    pub fn abilene() -> Self {
        Self {
            nodes: Site::iter()
                .map(|s| NodeEntry {
                    id: s.id(),
                    label: s.to_string(),
                })
                .collect(),
            edges: BACKBONE_EDGES
                .iter()
                .map(|(a, b)| EdgeEntry {
                    source: a.id(),
                    target: b.id(),
                })
                .collect(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path)
    }
}

impl Default for BackboneTables {
    fn default() -> Self {
        Self::abilene()
    }
}

/// Parameters of a single link that take precedence over the defaults of its class.
///
/// Without a `target`, the override applies to the link attaching the host of `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOverride {
    pub source: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    #[serde(flatten)]
    pub params: LinkParams,
}

impl LinkOverride {
    fn key(&self) -> (u32, Option<u32>) {
        match self.target {
            Some(target) => link_key(self.source, target),
            None => (self.source, None),
        }
    }
}

impl fmt::Display for LinkOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{} -- {}", self.source, target),
            None => write!(f, "{} -- host", self.source),
        }
    }
}

fn link_key(a: u32, b: u32) -> (u32, Option<u32>) {
    (a.min(b), Some(a.max(b)))
}

/// Link parameters and node metadata used to generate the backbone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackboneConfig {
    /// Defaults for links attaching a host to its switch.
    pub host_link: LinkParams,
    /// Defaults for links between two switches.
    pub backbone_link: LinkParams,
    pub overrides: Vec<LinkOverride>,
    /// Protocol version hint for all switches, e.g., `OpenFlow13`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<String>,
    /// Additional attributes for both nodes of a site, keyed by the site id.
    pub node_attributes: BTreeMap<u32, BTreeMap<String, String>>,
}

impl BackboneConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path)
    }

    /// Builder API: add an override for the link between the switches of two sites.
    pub fn with_override(mut self, source: u32, target: u32, params: LinkParams) -> Self {
        self.overrides.push(LinkOverride {
            source,
            target: Some(target),
            params,
        });
        self
    }

    /// Builder API: add an override for the host link of a site.
    pub fn with_host_override(mut self, site: u32, params: LinkParams) -> Self {
        self.overrides.push(LinkOverride {
            source: site,
            target: None,
            params,
        });
        self
    }
}

/// Link parameter variants used in previous experiments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, strum::Display, strum::EnumIter,
)]
pub enum Preset {
    /// No link parameters at all.
    Plain,
    /// 1ms on host links and 2ms on backbone links.
    Delay,
    /// 1 Gbps host links, OC-192 backbone links, and OpenFlow 1.3 switches.
    Oc192,
    /// 100 Mbps / 1ms host links and 10 Mbps / 2ms backbone links.
    Throttled,
}

impl Preset {
    pub fn config(&self) -> BackboneConfig {
        let ms = Duration::from_millis;
        match self {
            Self::Plain => BackboneConfig::default(),
            Self::Delay => BackboneConfig {
                host_link: LinkParams::new().delay(ms(1)),
                backbone_link: LinkParams::new().delay(ms(2)),
                ..Default::default()
            },
            Self::Oc192 => BackboneConfig {
                host_link: LinkParams::new().bandwidth(HOST_LINK_BW),
                backbone_link: LinkParams::new().bandwidth(OC192_BW),
                protocols: Some("OpenFlow13".to_string()),
                ..Default::default()
            },
            Self::Throttled => BackboneConfig {
                host_link: LinkParams::new().bandwidth(100.0).delay(ms(1)),
                backbone_link: LinkParams::new().bandwidth(10.0).delay(ms(2)),
                ..Default::default()
            },
        }
    }
}

fn addressing_error(label: &str, e: addressing::AddressingError) -> TopologyError {
    TopologyError::InvalidTopology(format!("site {label}: {e}"))
}

/// Generate the backbone graph.
///
/// For each site `i`, this creates the switch `s<i>`, the host `h<i>` (with address `10.0.<i>.1/24`
/// and MAC `00:00:00:00:00:<i>`), and the link between them. Then, it connects the switches
/// according to the edge table.
pub fn build_backbone(
    tables: &BackboneTables,
    config: &BackboneConfig,
) -> Result<Graph, TopologyError> {
    let mut overrides: HashMap<_, &LinkOverride> = HashMap::with_capacity(config.overrides.len());
    for o in &config.overrides {
        if let Some(previous) = overrides.insert(o.key(), o) {
            return Err(TopologyError::InvalidTopology(format!(
                "overrides {previous} and {o} refer to the same link"
            )));
        }
    }
    let mut applied = Vec::with_capacity(overrides.len());
    let mut params_for = |key: (u32, Option<u32>), default: &LinkParams| match overrides.get(&key)
    {
        Some(o) => {
            applied.push(key);
            o.params.or(default)
        }
        None => *default,
    };

    let mut builder = TopologyBuilder::new();

    for NodeEntry { id, label } in &tables.nodes {
        let net = addressing::host_net(*id).map_err(|e| addressing_error(label, e))?;
        let mac = addressing::host_mac(*id).map_err(|e| addressing_error(label, e))?;
        log::debug!("add site {label} (s{id}, h{id} with IP {net})");

        let mut attributes = config.node_attributes.get(id).cloned().unwrap_or_default();
        attributes.insert(attr::SITE.to_string(), label.clone());

        let mut switch_attributes = attributes.clone();
        if let Some(protocols) = &config.protocols {
            switch_attributes.insert(attr::PROTOCOLS.to_string(), protocols.clone());
        }
        builder.add_node(
            switch_id(*id),
            NodeKind::Switch,
            format!("s{id}"),
            switch_attributes,
        )?;

        let mut host_attributes = attributes;
        host_attributes.insert(attr::IP.to_string(), net.to_string());
        host_attributes.insert(attr::MAC.to_string(), addressing::format_mac(&mac));
        builder.add_node(host_id(*id), NodeKind::Host, format!("h{id}"), host_attributes)?;

        let params = params_for((*id, None), &config.host_link);
        builder.add_link(host_id(*id), switch_id(*id), params)?;
    }

    for EdgeEntry { source, target } in &tables.edges {
        let params = params_for(link_key(*source, *target), &config.backbone_link);
        builder.add_link(switch_id(*source), switch_id(*target), params)?;
    }

    if let Some(unused) = config
        .overrides
        .iter()
        .find(|o| !applied.contains(&o.key()))
    {
        return Err(TopologyError::InvalidTopology(format!(
            "override for {unused} does not match any link"
        )));
    }

    builder.build()
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;
    use crate::topology::LinkClass;

    #[test]
    fn site_ids() {
        assert_eq!(Site::iter().count(), 11);
        assert_eq!(Site::NewYork.id(), 0);
        assert_eq!(Site::Indianapolis.id(), 10);
        assert_eq!(Site::from_id(7), Some(Site::KansasCity));
        assert_eq!(Site::from_id(11), None);
        assert_eq!(Site::from_str("WashingtonDC"), Ok(Site::WashingtonDC));
    }

    #[test]
    fn tables() {
        let tables = BackboneTables::abilene();
        assert_eq!(tables.nodes.len(), 11);
        assert_eq!(tables.edges.len(), 14);
        assert_eq!(tables.nodes[4].label, "Sunnyvale");
        assert!(tables
            .edges
            .contains(&EdgeEntry { source: 1, target: 10 }));
    }

    #[test]
    fn preset_parameters() {
        let g = build_backbone(&BackboneTables::abilene(), &Preset::Throttled.config()).unwrap();
        for link in g.links_of(LinkClass::Access) {
            assert_eq!(link.params.bandwidth, Some(100.0));
            assert_eq!(link.params.delay, Some(Duration::from_millis(1)));
        }
        for link in g.links_of(LinkClass::Backbone) {
            assert_eq!(link.params.bandwidth, Some(10.0));
            assert_eq!(link.params.delay, Some(Duration::from_millis(2)));
        }

        let g = build_backbone(&BackboneTables::abilene(), &Preset::Oc192.config()).unwrap();
        assert!(g.switches().all(|s| s.attr(attr::PROTOCOLS) == Some("OpenFlow13")));
        assert!(g.hosts().all(|h| h.attr(attr::PROTOCOLS).is_none()));
        assert!(g
            .links_of(LinkClass::Backbone)
            .all(|l| l.params.bandwidth == Some(OC192_BW) && l.params.delay.is_none()));

        let g = build_backbone(&BackboneTables::abilene(), &Preset::Plain.config()).unwrap();
        assert!(g.links().all(|l| l.params.is_empty()));
    }

    #[test]
    fn overrides_take_precedence() {
        let config = Preset::Delay
            .config()
            // given in the opposite direction of the edge table
            .with_override(10, 1, LinkParams::new().bandwidth(40.0))
            .with_host_override(3, LinkParams::new().delay(Duration::from_millis(5)));
        let g = build_backbone(&BackboneTables::abilene(), &config).unwrap();

        let chicago_indy = g.link_between(switch_id(1), switch_id(10)).unwrap();
        assert_eq!(chicago_indy.params.bandwidth, Some(40.0));
        assert_eq!(chicago_indy.params.delay, Some(Duration::from_millis(2)));

        let seattle_host = g.link_between(host_id(3), switch_id(3)).unwrap();
        assert_eq!(seattle_host.params.delay, Some(Duration::from_millis(5)));

        let ny_chicago = g.link_between(switch_id(0), switch_id(1)).unwrap();
        assert_eq!(ny_chicago.params.bandwidth, None);
    }

    #[test]
    fn unused_override_is_rejected() {
        // there is no link between New York and Seattle
        let config = BackboneConfig::default().with_override(0, 3, LinkParams::new());
        assert!(matches!(
            build_backbone(&BackboneTables::abilene(), &config),
            Err(TopologyError::InvalidTopology(_))
        ));
    }

    #[test]
    fn repeated_override_is_rejected() {
        // the same link, once in each direction
        let config = BackboneConfig::default()
            .with_override(0, 1, LinkParams::new().bandwidth(40.0))
            .with_override(1, 0, LinkParams::new().bandwidth(7.0));
        match build_backbone(&BackboneTables::abilene(), &config) {
            Err(TopologyError::InvalidTopology(msg)) => {
                assert!(msg.contains("0 -- 1"), "{msg}");
                assert!(msg.contains("1 -- 0"), "{msg}");
            }
            x => panic!("unexpected result {x:?}"),
        }

        let config = BackboneConfig::default()
            .with_host_override(4, LinkParams::new().delay(Duration::from_millis(1)))
            .with_host_override(4, LinkParams::new().delay(Duration::from_millis(3)));
        assert!(matches!(
            build_backbone(&BackboneTables::abilene(), &config),
            Err(TopologyError::InvalidTopology(msg)) if msg.contains("4 -- host")
        ));
    }

    #[test]
    fn invalid_bandwidth_in_config() {
        for bw in ["-10", "0"] {
            let config: BackboneConfig =
                serde_json::from_str(&format!(r#"{{"backbone_link": {{"bandwidth": {bw}}}}}"#))
                    .unwrap();
            assert!(matches!(
                build_backbone(&BackboneTables::abilene(), &config),
                Err(TopologyError::InvalidTopology(msg)) if msg.contains("bandwidth")
            ));
        }

        let config: BackboneConfig = serde_json::from_str(
            r#"{"overrides": [{"source": 5, "bandwidth": -1.5}]}"#,
        )
        .unwrap();
        assert!(matches!(
            build_backbone(&BackboneTables::abilene(), &config),
            Err(TopologyError::InvalidTopology(msg)) if msg.contains("-1.5")
        ));
    }

    #[test]
    fn edge_to_missing_site() {
        let tables = BackboneTables {
            nodes: (0..3)
                .map(|id| NodeEntry {
                    id,
                    label: format!("n{id}"),
                })
                .collect(),
            edges: vec![
                EdgeEntry { source: 0, target: 1 },
                EdgeEntry { source: 2, target: 3 },
            ],
        };
        assert_eq!(
            build_backbone(&tables, &BackboneConfig::default()).unwrap_err(),
            TopologyError::UnknownNode {
                missing: NodeId(3),
                a: NodeId(2),
                b: NodeId(3)
            }
        );
    }

    #[test]
    fn duplicate_site() {
        let mut tables = BackboneTables::abilene();
        tables.nodes.push(NodeEntry {
            id: 4,
            label: "Sunnyvale2".to_string(),
        });
        assert!(matches!(
            build_backbone(&tables, &BackboneConfig::default()),
            Err(TopologyError::DuplicateNode { id: NodeId(4), .. })
        ));
    }

    #[test]
    fn site_outside_address_plan() {
        let tables = BackboneTables {
            nodes: vec![NodeEntry {
                id: 300,
                label: "Remote".to_string(),
            }],
            edges: vec![],
        };
        assert!(matches!(
            build_backbone(&tables, &BackboneConfig::default()),
            Err(TopologyError::InvalidTopology(msg)) if msg.contains("Remote")
        ));
    }

    #[test]
    fn node_metadata() {
        let mut config = BackboneConfig::default();
        config.node_attributes.insert(
            2,
            BTreeMap::from([("region".to_string(), "east".to_string())]),
        );
        let g = build_backbone(&BackboneTables::abilene(), &config).unwrap();
        assert_eq!(g.node(switch_id(2)).unwrap().attr("region"), Some("east"));
        assert_eq!(g.node(host_id(2)).unwrap().attr("region"), Some("east"));
        assert_eq!(g.node(host_id(3)).unwrap().attr("region"), None);
    }

    #[test]
    fn config_from_json() {
        let config: BackboneConfig = serde_json::from_str(
            r#"{
                "host_link": {"bandwidth": 1000},
                "backbone_link": {"bandwidth": 10000, "delay": 2},
                "overrides": [{"source": 0, "target": 1, "delay": 7.5}],
                "protocols": "OpenFlow13",
                "node_attributes": {"10": {"role": "receiver"}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.host_link, LinkParams::new().bandwidth(1000.0));
        assert_eq!(
            config.overrides[0].params,
            LinkParams::new().delay(Duration::from_micros(7500))
        );
        let g = build_backbone(&BackboneTables::abilene(), &config).unwrap();
        let link = g.link_between(switch_id(0), switch_id(1)).unwrap();
        assert_eq!(link.params.bandwidth, Some(10_000.0));
        assert_eq!(link.params.delay, Some(Duration::from_micros(7500)));
        assert_eq!(g.node(host_id(10)).unwrap().attr("role"), Some("receiver"));
    }
}
