//! Fleet configuration loading and management.
//!
//! The planners take plain data-model values; this module is the input
//! adapter that produces them from a YAML fleet description:
//!
//! ```yaml
//! nodes:
//!   node01:
//!     cpu: 8
//!     ram: 4096
//!     slots: 2
//!   node02:
//!     cpu: 4
//!     ram: 2048
//! time_slots: [0, 1, 2, 3, 4, 5]
//! ```
//!
//! Node declaration order is preserved — it drives placement scan order in
//! Phases 1 and 3, so it is part of the planning contract, not cosmetics.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::task::Node;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private – callers work with [`FleetConfigManager`] instead.
#[derive(Debug, Deserialize)]
struct FleetConfigFile {
    #[serde(default)]
    nodes: IndexMap<String, NodeEntry>,
    #[serde(default)]
    time_slots: Vec<u64>,
}

/// Per-node fields as they appear in the YAML file.
///
/// Every field is optional so partial configs are accepted gracefully;
/// missing values fall back to their defaults.
#[derive(Debug, Deserialize)]
struct NodeEntry {
    #[serde(default = "default_cpu")]
    cpu: u64,
    /// Defaults to `u64::MAX` (unconstrained) when absent from YAML.
    #[serde(default = "default_ram")]
    ram: u64,
    #[serde(default = "default_slots")]
    slots: u32,
}

fn default_cpu() -> u64 {
    1
}

/// Serde default for `ram`: `u64::MAX` means "no constraint".
fn default_ram() -> u64 {
    u64::MAX
}

fn default_slots() -> u32 {
    1
}

// ── FleetConfigManager ────────────────────────────────────────────────────────

/// Loads and manages the fleet description from a YAML file.
#[derive(Debug, Default)]
pub struct FleetConfigManager {
    nodes: IndexMap<String, Node>,
    time_slots: BTreeSet<u64>,
    loaded: bool,
}

impl FleetConfigManager {
    /// Creates a new, empty `FleetConfigManager`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and populates the node list and time horizon.
    ///
    /// * If the file declares no nodes, a single `"default_node"` is
    ///   inserted so downstream planners always have a fleet to work with.
    /// * Calling this method a second time replaces all previously loaded
    ///   state.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the YAML is
    /// structurally invalid.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading fleet configuration from: {}", path.display());

        // Reset state before (re-)loading
        self.nodes.clear();
        self.time_slots.clear();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: FleetConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        for (name, entry) in file.nodes {
            let node = Node::new(name.clone(), entry.cpu, entry.ram, entry.slots);
            debug!(
                "  Node: {} | cpu: {} | ram: {} | slots: {}",
                node.id, node.cpu_capacity, node.ram_capacity, node.slots,
            );
            self.nodes.insert(name, node);
        }

        // Fallback: no nodes parsed → insert a default entry
        if self.nodes.is_empty() {
            warn!("No nodes found in configuration file, using default node");
            self.nodes.insert(
                "default_node".to_string(),
                Node::new("default_node", 4, 4096, 4),
            );
        }

        self.time_slots = file.time_slots.into_iter().collect();
        self.loaded = true;

        info!(
            "Successfully loaded {} node(s) over {} time slot(s)",
            self.nodes.len(),
            self.time_slots.len(),
        );

        Ok(())
    }

    /// Returns the loaded nodes in declaration order.
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Returns a reference to the [`Node`] named `name`, if loaded.
    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// The configured planning horizon as an ordered slot set.
    pub fn time_slots(&self) -> BTreeSet<u64> {
        self.time_slots.clone()
    }

    /// Returns `true` after a successful call to
    /// [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
