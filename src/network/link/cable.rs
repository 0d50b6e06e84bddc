use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
};

use parking_lot::{Condvar, Mutex};

use super::{check_send, LinkTransport};
use crate::{
    error::{Result, SwitchError},
    network::ethernet::MacAddress,
};

#[derive(Debug, Default)]
struct Inbox {
    frames: VecDeque<(usize, Vec<u8>)>,
    closed: bool,
}

/// The far end of a cable.
#[derive(Debug, Clone)]
struct Cable {
    peer: Weak<CableLink>,
    peer_port: usize,
}

/// An in-memory set of ports, each optionally cabled to a port of another `CableLink`.
///
/// Frames sent on a cabled port land in the peer's inbox. Frames sent on a port
/// without a cable are kept in that port's outgoing buffer so they can be inspected.
#[derive(Debug)]
pub struct CableLink {
    mac_address: MacAddress,
    names: Vec<String>,

    /// Incoming frames from every port, in arrival order
    inbox: Mutex<Inbox>,
    ready: Condvar,

    /// None if a physical connection is not established
    cables: Mutex<Vec<Option<Cable>>>,
    outgoing: Mutex<Vec<Vec<Vec<u8>>>>,
}

impl CableLink {
    pub fn new(port_count: usize, mac_address: MacAddress) -> Arc<CableLink> {
        Arc::new(CableLink {
            mac_address,
            names: (0..port_count).map(|i| format!("cable{}", i)).collect(),
            inbox: Mutex::new(Inbox::default()),
            ready: Condvar::new(),
            cables: Mutex::new(vec![None; port_count]),
            outgoing: Mutex::new(vec![Vec::new(); port_count]),
        })
    }

    /// Connects two ports together. This is a bi-directional connection.
    ///
    /// Fails if either port doesn't exist or already has a connection.
    pub fn connect(
        link1: &Arc<CableLink>,
        port1: usize,
        link2: &Arc<CableLink>,
        port2: usize,
    ) -> Result<()> {
        for (link, port) in [(link1, port1), (link2, port2)] {
            match link.cables.lock().get(port) {
                None => return Err(SwitchError::UnknownPort(port)),
                Some(Some(_)) => {
                    return Err(SwitchError::transport(format!(
                        "port {} already has a connection",
                        port
                    )))
                }
                Some(None) => {}
            }
        }

        link1.cables.lock()[port1] = Some(Cable {
            peer: Arc::downgrade(link2),
            peer_port: port2,
        });
        link2.cables.lock()[port2] = Some(Cable {
            peer: Arc::downgrade(link1),
            peer_port: port1,
        });
        Ok(())
    }

    /// Mutually disconnects a port and its peer.
    pub fn disconnect(&self, port: usize) {
        let cable = match self.cables.lock().get_mut(port) {
            Some(slot) => slot.take(),
            None => None,
        };

        if let Some(cable) = cable {
            if let Some(peer) = cable.peer.upgrade() {
                if let Some(slot) = peer.cables.lock().get_mut(cable.peer_port) {
                    *slot = None;
                }
            }
        }
    }

    /// Puts a frame into the inbox as if it arrived on `port`.
    pub fn inject(&self, port: usize, frame: Vec<u8>) {
        let mut inbox = self.inbox.lock();
        if inbox.closed {
            return;
        }
        inbox.frames.push_back((port, frame));
        self.ready.notify_one();
    }

    /// Takes the next frame without blocking.
    pub fn try_receive(&self) -> Option<(usize, Vec<u8>)> {
        self.inbox.lock().frames.pop_front()
    }

    pub fn has_incoming(&self) -> bool {
        !self.inbox.lock().frames.is_empty()
    }

    /// Clears the outgoing buffer of an unconnected port and returns it.
    pub fn consume_outgoing(&self, port: usize) -> Vec<Vec<u8>> {
        match self.outgoing.lock().get_mut(port) {
            Some(buffer) => std::mem::take(buffer),
            None => Vec::new(),
        }
    }

    /// Wakes any blocked receiver. Receiving and sending fail from now on.
    pub fn shutdown(&self) {
        let mut inbox = self.inbox.lock();
        inbox.closed = true;
        self.ready.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.inbox.lock().closed
    }
}

impl LinkTransport for CableLink {
    fn port_count(&self) -> usize {
        self.names.len()
    }

    fn receive_from_any_port(&self) -> Result<(usize, Vec<u8>)> {
        let mut inbox = self.inbox.lock();
        loop {
            if let Some(next) = inbox.frames.pop_front() {
                return Ok(next);
            }
            if inbox.closed {
                return Err(SwitchError::transport("link shut down"));
            }
            self.ready.wait(&mut inbox);
        }
    }

    fn send_to_port(&self, port: usize, frame: &[u8]) -> Result<()> {
        check_send(self.port_count(), port, frame)?;
        if self.is_closed() {
            return Err(SwitchError::transport("link shut down"));
        }

        // Never hold our own lock while delivering into the peer
        let cable = self.cables.lock()[port].clone();
        match cable.and_then(|c| c.peer.upgrade().map(|peer| (peer, c.peer_port))) {
            Some((peer, peer_port)) => peer.inject(peer_port, frame.to_vec()),
            None => self.outgoing.lock()[port].push(frame.to_vec()),
        }
        Ok(())
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
