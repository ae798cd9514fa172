//! Declarative network topology for the `wsn-sim` binary: which nodes
//! exist, which dialect they speak, which pairs can hear each other, and
//! the seed driving HELLO jitter and synthetic sensor readings. The
//! protocol core itself never reads a config file — only `main.rs` does,
//! to build a [`crate::sim::network::Network`] or
//! [`crate::sim::live::LiveNetwork`] from it.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::Dialect;
use crate::node::event::NodeId;
use crate::sim::Role;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub links: Vec<(NodeId, NodeId)>,
}

#[derive(Debug, Deserialize)]
pub struct NodeConfig {
    pub id: NodeId,
    pub role: Role,
}

fn default_seed() -> u64 {
    1
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("reading topology file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing topology file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Topology {
    pub fn load(path: &Path) -> Result<Self, TopologyError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// A small two-hop topology (§8 scenario S1) used as the default demo when
/// no `--topology` file is given.
pub fn default_demo() -> Topology {
    Topology {
        dialect: Dialect::Energised,
        seed: 1,
        nodes: vec![
            NodeConfig { id: crate::config::BORDER_NODE_ID, role: Role::Computation },
            NodeConfig { id: 2, role: Role::Computation },
            NodeConfig { id: 3, role: Role::Sensor },
        ],
        links: vec![(crate::config::BORDER_NODE_ID, 2), (2, 3)],
    }
}
