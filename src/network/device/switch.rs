use std::{sync::Arc, thread};

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::{
    mac_table::MacTable,
    stp::{BridgeState, BridgeStatus, SpanningTree, HELLO_INTERVAL},
    Egress,
};
use crate::{
    config::{PortMode, SwitchConfig},
    error::{Result, SwitchError},
    network::{
        ethernet::{
            bpdu::{Bpdu, BridgeId},
            vlan::{insert_tag, rewrite_tag, strip_tag},
            EthernetHeader, MacAddress, VlanId,
        },
        link::{LinkTransport, MAX_FRAME_LEN},
    },
};

/// What happens to an already tagged frame crossing from one trunk port to another.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, clap::ValueEnum)]
pub enum TrunkPolicy {
    /// Forward with the existing tag untouched.
    #[default]
    Preserve,
    /// Replace the tag with one carrying only the resolved VLAN id.
    Rewrite,
    /// Push a second tag in front of the existing one.
    Stack,
}

/// A layer two switch; forwards Ethernet frames to the correct ports within a VLAN.
///
/// Runs a simplified Spanning Tree Protocol over its trunk ports to prevent loops.
pub struct Switch {
    ports: Vec<PortMode>,
    table: MacTable, // maps an address to the port it's connected to.
    trunk_policy: TrunkPolicy,

    // Shared with the hello task
    stp: Arc<Mutex<SpanningTree>>,
    hello_failure: Arc<Mutex<Option<SwitchError>>>, // Set once the hello task has stopped
}

impl Switch {
    /// Creates a switch from its configuration. The switch assumes it is the root bridge,
    /// with every trunk port forwarding.
    pub fn new(config: &SwitchConfig, mac_address: MacAddress) -> Switch {
        let bid = BridgeId::new(config.priority, mac_address);
        Switch {
            ports: config.ports.clone(),
            table: MacTable::new(),
            trunk_policy: TrunkPolicy::default(),
            stp: Arc::new(Mutex::new(SpanningTree::new(bid, &config.ports))),
            hello_failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_trunk_policy(mut self, trunk_policy: TrunkPolicy) -> Switch {
        self.trunk_policy = trunk_policy;
        self
    }

    /// Returns the Bridge ID of the switch. (Bridge Priority + Bridge MAC Address)
    pub fn bid(&self) -> BridgeId {
        self.stp.lock().bridge().own_bridge_id
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    pub fn table(&self) -> &MacTable {
        &self.table
    }

    /// A snapshot of the bridge state.
    pub fn bridge_state(&self) -> BridgeState {
        *self.stp.lock().bridge()
    }

    pub fn status(&self) -> BridgeStatus {
        self.stp.lock().status()
    }

    pub fn spanning_tree(&self) -> Arc<Mutex<SpanningTree>> {
        Arc::clone(&self.stp)
    }

    /// Processes one frame received on `port` and returns the frames to transmit.
    ///
    /// BPDUs update the spanning tree; everything else is switched within its VLAN.
    pub fn handle_frame(&mut self, port: usize, frame: &[u8]) -> Result<Vec<Egress>> {
        if port >= self.ports.len() {
            return Err(SwitchError::UnknownPort(port));
        }

        let header = EthernetHeader::parse(frame)?;
        trace!(
            port,
            len = frame.len(),
            src = %header.source_address,
            dst = %header.destination_address,
            "frame received"
        );

        if header.is_bpdu() {
            let bpdu = Bpdu::from_frame(frame)?;
            return Ok(self.stp.lock().receive_bpdu(&bpdu, port));
        }

        Ok(self.receive_data(port, &header, frame))
    }

    fn receive_data(&mut self, port: usize, header: &EthernetHeader, frame: &[u8]) -> Vec<Egress> {
        if header.source_address.is_group() {
            debug!(port, src = %header.source_address, "dropping frame with a group source address");
            return Vec::new();
        }

        let stp = self.stp.lock();
        if !stp.is_forwarding(port) {
            trace!(port, "dropping frame on a blocking port");
            return Vec::new();
        }

        let ingress = self.ports[port];
        let vlan = match (ingress, header.vlan_id) {
            (PortMode::Access(vlan), None) => vlan,
            (PortMode::Trunk, Some(vlan)) => vlan,
            // Access ports never accept a tag; a host must not pick its own VLAN
            (PortMode::Access(_), Some(vlan)) => {
                debug!(port, vlan, "dropping tagged frame on an access port");
                return Vec::new();
            }
            (PortMode::Trunk, None) => {
                debug!(port, "dropping untagged frame on a trunk port");
                return Vec::new();
            }
        };

        // Learn before anything is sent; learning is never undone.
        if let Some(previous) = self.table.learn(header.source_address, port) {
            debug!(address = %header.source_address, from = previous, to = port, "address moved");
        }

        let destination = header.destination_address;
        let candidates: Vec<usize> = match self.table.lookup(&destination) {
            Some(known) if !destination.is_group() => vec![known],
            _ => (0..self.ports.len()).collect(),
        };

        let mut egress = Vec::new();
        for candidate in candidates.into_iter().filter(|c| *c != port) {
            let Some(mode) = self.ports.get(candidate).copied() else {
                warn!(port = candidate, "{}", SwitchError::UnknownPort(candidate));
                continue;
            };

            if !stp.is_forwarding(candidate) {
                continue;
            }

            match tag_for_egress(self.trunk_policy, ingress, mode, vlan, frame) {
                Ok(Some(bytes)) if bytes.len() >= MAX_FRAME_LEN => {
                    warn!(port = candidate, len = bytes.len(), "frame too large after tagging");
                }
                Ok(Some(bytes)) => egress.push(Egress::new(candidate, bytes)),
                Ok(None) => {}
                Err(e) => debug!(port = candidate, error = %e, "cannot retag frame"),
            }
        }

        egress
    }

    /// BPDUs to originate this interval. Empty unless this switch is the root bridge.
    pub fn hello(&self) -> Vec<Egress> {
        self.stp.lock().hello()
    }

    /// Receives and switches frames until the transport fails, either here or in
    /// the hello task.
    pub fn run(&mut self, link: &dyn LinkTransport) -> Result<()> {
        info!(bid = %self.bid(), ports = self.ports.len(), "switch running");

        loop {
            if let Some(e) = self.hello_failure.lock().take() {
                return Err(e);
            }

            let (port, frame) = link.receive_from_any_port()?;
            match self.handle_frame(port, &frame) {
                Ok(egress) => transmit(link, egress)?,
                Err(e) if e.is_recoverable() => debug!(port, error = %e, "dropping frame"),
                Err(e) => return Err(e),
            }
        }
    }

    /// Starts the background task originating BPDUs every `HELLO_INTERVAL`.
    ///
    /// The BPDUs are built under the spanning tree lock and sent after it is released.
    /// A transport failure stops the task and ends `run` on its next iteration.
    pub fn spawn_hello_task(
        &self,
        link: Arc<dyn LinkTransport>,
    ) -> std::io::Result<thread::JoinHandle<Result<()>>> {
        let stp = Arc::clone(&self.stp);
        let failure = Arc::clone(&self.hello_failure);

        thread::Builder::new()
            .name("stp-hello".to_string())
            .spawn(move || -> Result<()> {
                loop {
                    let egress = stp.lock().hello();
                    if let Err(e) = transmit(link.as_ref(), egress) {
                        error!(error = %e, "hello task stopped");
                        failure
                            .lock()
                            .get_or_insert_with(|| SwitchError::transport(format!("hello task: {}", e)));
                        return Err(e);
                    }
                    thread::sleep(HELLO_INTERVAL);
                }
            })
    }
}

/// Sends every frame, even after a failure.
///
/// Per-frame errors are logged and skipped. The first transport failure is returned
/// once all ports have been attempted.
pub fn transmit(link: &dyn LinkTransport, egress: Vec<Egress>) -> Result<()> {
    let mut first_failure = None;

    for Egress { port, frame } in egress {
        match link.send_to_port(port, &frame) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => warn!(port, error = %e, "frame not sent"),
            Err(e) => {
                error!(port, error = %e, "send failed");
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Adjusts the tag of a frame switched from `ingress` to `egress` within `vlan`.
///
/// ## Returns
/// * `None` if the frame must not reach the egress port.
/// * `Some(bytes)` with the frame to transmit.
fn tag_for_egress(
    policy: TrunkPolicy,
    ingress: PortMode,
    egress: PortMode,
    vlan: VlanId,
    frame: &[u8],
) -> Result<Option<Vec<u8>>> {
    let bytes = match (ingress, egress) {
        (PortMode::Access(from), PortMode::Access(to)) => {
            if from != to {
                return Ok(None);
            }
            frame.to_vec()
        }
        (PortMode::Access(_), PortMode::Trunk) => insert_tag(frame, vlan)?,
        (PortMode::Trunk, PortMode::Access(to)) => {
            if vlan != to {
                return Ok(None);
            }
            strip_tag(frame)?
        }
        (PortMode::Trunk, PortMode::Trunk) => match policy {
            TrunkPolicy::Preserve => frame.to_vec(),
            TrunkPolicy::Rewrite => rewrite_tag(frame, vlan)?,
            TrunkPolicy::Stack => insert_tag(frame, vlan)?,
        },
    };

    Ok(Some(bytes))
}
