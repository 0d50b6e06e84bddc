use std::time::Duration;

use tracing::{debug, info, warn};

use super::Egress;
use crate::{
    config::PortMode,
    network::ethernet::bpdu::{Bpdu, BridgeId},
};

/// Cost added for every hop towards the root bridge.
pub const LINK_COST: u32 = 10;

/// How often the root bridge originates BPDUs.
pub const HELLO_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StpState {
    Blocking = 0,   // No forwarded frames, no learning; BPDUs are still exchanged
    Forwarding = 1, // Forwarded frames and learning
}

/// Whether this switch currently believes it is the root bridge.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BridgeStatus {
    Root,
    NonRoot { root_port: usize },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BridgeState {
    pub own_bridge_id: BridgeId,
    pub root_bridge_id: BridgeId, // Never greater than `own_bridge_id`
    pub root_path_cost: u32,      // 0 for the root bridge
    pub root_port: Option<usize>, // None while the switch is the root bridge
}

impl BridgeState {
    /// Every switch starts out believing it is the root bridge.
    pub fn new(own_bridge_id: BridgeId) -> BridgeState {
        BridgeState {
            own_bridge_id,
            root_bridge_id: own_bridge_id,
            root_path_cost: 0,
            root_port: None,
        }
    }

    pub fn status(&self) -> BridgeStatus {
        match self.root_port {
            Some(root_port) if self.root_bridge_id != self.own_bridge_id => {
                BridgeStatus::NonRoot { root_port }
            }
            _ => BridgeStatus::Root,
        }
    }
}

/// Bridge identity, root election and trunk port states.
///
/// Implements a reduced 802.1D: a single tree, no message aging, and port state
/// changes that take effect immediately on receipt of a BPDU.
#[derive(Debug)]
pub struct SpanningTree {
    bridge: BridgeState,
    ports: Vec<Option<StpState>>, // None for ports that don't participate (access ports)
}

impl SpanningTree {
    /// Trunk ports start forwarding: a switch that believes it is the root designates all of its ports.
    pub fn new(own_bridge_id: BridgeId, ports: &[PortMode]) -> SpanningTree {
        SpanningTree {
            bridge: BridgeState::new(own_bridge_id),
            ports: ports
                .iter()
                .map(|mode| mode.is_trunk().then_some(StpState::Forwarding))
                .collect(),
        }
    }

    pub fn bridge(&self) -> &BridgeState {
        &self.bridge
    }

    pub fn status(&self) -> BridgeStatus {
        self.bridge.status()
    }

    pub fn is_root_bridge(&self) -> bool {
        self.status() == BridgeStatus::Root
    }

    /// None if the port is not STP managed or doesn't exist.
    pub fn port_state(&self, port: usize) -> Option<StpState> {
        self.ports.get(port).copied().flatten()
    }

    /// Access ports always forward. Ports outside the switch never do.
    pub fn is_forwarding(&self, port: usize) -> bool {
        match self.ports.get(port) {
            Some(Some(state)) => *state == StpState::Forwarding,
            Some(None) => true,
            None => false,
        }
    }

    pub fn managed_ports(&self) -> impl Iterator<Item = usize> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, state)| state.is_some())
            .map(|(i, _)| i)
    }

    /// Returns all managed ports in the blocking state.
    pub fn blocking_ports(&self) -> Vec<usize> {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == Some(StpState::Blocking))
            .map(|(i, _)| i)
            .collect()
    }

    /// The periodic BPDU. Only the root bridge originates; everyone else stays silent.
    pub fn hello(&self) -> Vec<Egress> {
        if !self.is_root_bridge() {
            return Vec::new();
        }

        let frame = Bpdu::hello(self.bridge.own_bridge_id).to_frame(self.bridge.own_bridge_id.mac);
        self.managed_ports()
            .map(|port| Egress::new(port, frame.clone()))
            .collect()
    }

    /// Updates the bridge state and port states from a BPDU received on `port_id`.
    ///
    /// ## Returns
    /// The BPDUs to transmit in response.
    pub fn receive_bpdu(&mut self, bpdu: &Bpdu, port_id: usize) -> Vec<Egress> {
        match self.ports.get(port_id) {
            None => {
                warn!(port = port_id, "BPDU on a port outside the switch");
                return Vec::new();
            }
            Some(None) => {
                debug!(port = port_id, "ignoring BPDU on an access port");
                return Vec::new();
            }
            Some(Some(_)) => {}
        }

        let own = self.bridge.own_bridge_id;
        if bpdu.sender.mac == own.mac {
            debug!(port = port_id, "ignoring our own BPDU");
            return Vec::new();
        }

        // Incoming BPDU's root is better: it becomes our root, reached through this port
        if bpdu.root < self.bridge.root_bridge_id {
            self.bridge.root_bridge_id = bpdu.root;
            self.bridge.root_port = Some(port_id);
            self.bridge.root_path_cost = bpdu.root_path_cost.saturating_add(LINK_COST);
            info!(
                root = %bpdu.root,
                port = port_id,
                cost = self.bridge.root_path_cost,
                "new root bridge"
            );

            // Every other port has to prove it is designated for its segment again
            let others: Vec<usize> = self.managed_ports().filter(|p| *p != port_id).collect();
            for &port in &others {
                self.set_state(port, StpState::Blocking);
            }
            self.set_state(port_id, StpState::Forwarding);

            return self.advertise(others);
        }

        // Equivalent root bridges
        if bpdu.root == self.bridge.root_bridge_id {
            if self.bridge.root_port == Some(port_id) {
                let cost = bpdu.root_path_cost.saturating_add(LINK_COST);
                if cost < self.bridge.root_path_cost {
                    debug!(from = self.bridge.root_path_cost, to = cost, "root path cost improved");
                    self.bridge.root_path_cost = cost;
                }

                // Pass the root's hello down the tree
                let all: Vec<usize> = self.managed_ports().collect();
                return self.advertise(all);
            }

            // The neighbour is farther from the root: we are designated for this segment.
            // A cheaper neighbour leaves the port as it is.
            if bpdu.root_path_cost > self.bridge.root_path_cost {
                self.set_state(port_id, StpState::Forwarding);
            }

            return Vec::new();
        }

        if bpdu.sender == self.bridge.root_bridge_id {
            self.set_state(port_id, StpState::Blocking);
        }

        Vec::new()
    }

    /// Our view of the tree, sent on each of `ports`.
    fn advertise(&self, ports: Vec<usize>) -> Vec<Egress> {
        let own = self.bridge.own_bridge_id;
        let bpdu = Bpdu {
            root: self.bridge.root_bridge_id,
            root_path_cost: self.bridge.root_path_cost,
            sender: own,
        };
        let frame = bpdu.to_frame(own.mac);

        ports
            .into_iter()
            .map(|port| Egress::new(port, frame.clone()))
            .collect()
    }

    fn set_state(&mut self, port: usize, state: StpState) {
        if let Some(Some(current)) = self.ports.get_mut(port) {
            if *current != state {
                info!(port, ?state, "port state changed");
                *current = state;
            }
        }
    }
}
