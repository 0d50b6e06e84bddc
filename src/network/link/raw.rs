use std::{io, sync::mpsc, thread};

use parking_lot::Mutex;
use pnet_datalink::{Channel, DataLinkSender};
use tracing::{debug, error};

use super::{check_send, LinkTransport};
use crate::{
    error::{Result, SwitchError},
    network::ethernet::MacAddress,
};

type Received = (usize, io::Result<Vec<u8>>);

/// Ports backed by host network interfaces, one raw Ethernet channel each.
///
/// A reader thread per interface feeds a single queue, which is what
/// `receive_from_any_port` blocks on.
pub struct RawLink {
    mac_address: MacAddress,
    names: Vec<String>,
    senders: Vec<Mutex<Box<dyn DataLinkSender>>>,
    incoming: Mutex<mpsc::Receiver<Received>>,
}

impl RawLink {
    /// Opens a channel on every named interface. Port `i` is `interface_names[i]`.
    ///
    /// The switch MAC is `mac_address` if given, otherwise the first interface's
    /// address, otherwise a random locally administered one.
    pub fn open(interface_names: &[String], mac_address: Option<MacAddress>) -> Result<RawLink> {
        if interface_names.is_empty() {
            return Err(SwitchError::transport("no interfaces given"));
        }

        let interfaces = pnet_datalink::interfaces();
        let (tx, rx) = mpsc::channel::<Received>();
        let mut senders = Vec::with_capacity(interface_names.len());
        let mut first_mac = None;

        for (index, name) in interface_names.iter().enumerate() {
            let interface = interfaces
                .iter()
                .find(|i| &i.name == name)
                .ok_or_else(|| SwitchError::transport(format!("interface '{}' not found", name)))?;

            if first_mac.is_none() {
                first_mac = interface
                    .mac
                    .map(|m| MacAddress([m.0, m.1, m.2, m.3, m.4, m.5]));
            }

            let (sender, mut receiver) = match pnet_datalink::channel(interface, Default::default()) {
                Ok(Channel::Ethernet(sender, receiver)) => (sender, receiver),
                Ok(_) => {
                    return Err(SwitchError::transport(format!(
                        "unsupported channel type on '{}'",
                        name
                    )))
                }
                Err(e) => {
                    return Err(SwitchError::transport(format!(
                        "failed to open '{}': {}",
                        name, e
                    )))
                }
            };
            senders.push(Mutex::new(sender));

            let tx = tx.clone();
            let thread_name = format!("rx-{}", name);
            thread::Builder::new().name(thread_name).spawn(move || loop {
                let received = receiver.next().map(|frame| frame.to_vec());
                let failed = received.is_err();
                if tx.send((index, received)).is_err() || failed {
                    debug!(port = index, "reader stopped");
                    break;
                }
            })?;
        }

        let mac_address = mac_address
            .or(first_mac)
            .unwrap_or_else(MacAddress::random_local);

        Ok(RawLink {
            mac_address,
            names: interface_names.to_vec(),
            senders,
            incoming: Mutex::new(rx),
        })
    }
}

impl LinkTransport for RawLink {
    fn port_count(&self) -> usize {
        self.names.len()
    }

    fn receive_from_any_port(&self) -> Result<(usize, Vec<u8>)> {
        let (port, received) = self
            .incoming
            .lock()
            .recv()
            .map_err(|_| SwitchError::transport("every interface reader has stopped"))?;

        received.map(|frame| (port, frame)).map_err(|e| {
            error!(port, error = %e, "receive failed");
            SwitchError::Io(e)
        })
    }

    fn send_to_port(&self, port: usize, frame: &[u8]) -> Result<()> {
        check_send(self.port_count(), port, frame)?;

        self.senders[port]
            .lock()
            .send_to(frame, None)
            .ok_or_else(|| SwitchError::transport(format!("failed to send on {}", self.names[port])))?
            .map_err(SwitchError::Io)
    }

    fn own_mac(&self) -> MacAddress {
        self.mac_address
    }

    fn port_name(&self, port: usize) -> String {
        self.names
            .get(port)
            .cloned()
            .unwrap_or_else(|| format!("port{}", port))
    }
}
