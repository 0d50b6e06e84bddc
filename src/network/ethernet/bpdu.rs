//! Bridge Protocol Data Unit codec.
//!
//! The layout is fixed-offset and must stay in lockstep between `to_frame` and
//! `from_frame`; no other module reads BPDU bytes directly.

use std::{cmp::Ordering, fmt};

use super::{read_mac, MacAddress, BPDU_TYPE_FIELD};
use crate::error::{Result, SwitchError};

const LLC_HEADER: [u8; 3] = [0x42, 0x42, 0x03];

/// Protocol id (2), version (1), BPDU type (1), flags (1).
const PROTOCOL_BLOCK: [u8; 5] = [0x00; 5];

/// Constant tail expected by every bridge on this network.
const TRAILER: [u8; 10] = [0x80, 0x04, 0x01, 0x00, 0x14, 0x00, 0x02, 0x00, 0x0f, 0x00];

const ROOT_PRIORITY_OFFSET: usize = 22;
const ROOT_ID_OFFSET: usize = 24;
const PATH_COST_OFFSET: usize = 30;
const SENDER_PRIORITY_OFFSET: usize = 34;
const SENDER_ID_OFFSET: usize = 36;

/// Length of an encoded BPDU frame before padding.
pub const BPDU_FRAME_LEN: usize = 52;

/// BPDUs are padded to the Ethernet minimum before transmission.
pub const MIN_FRAME_LEN: usize = 60;

/// Bridge identity: priority first, MAC address as the tie-break. Lower is better.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct BridgeId {
    pub priority: u8,
    pub mac: MacAddress,
}

impl BridgeId {
    pub fn new(priority: u8, mac: MacAddress) -> BridgeId {
        BridgeId { priority, mac }
    }
}

impl Ord for BridgeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.mac.cmp(&other.mac))
    }
}

impl PartialOrd for BridgeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BridgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.priority, self.mac)
    }
}

/// Take in a MAC address and a u8 priority to create a bridge ID.
#[macro_export]
macro_rules! bridge_id {
    ($mac:expr, $priority:expr) => {
        $crate::network::ethernet::bpdu::BridgeId::new($priority as u8, $mac)
    };
}

/// The fields this switch exchanges in a BPDU.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Bpdu {
    pub root: BridgeId,
    pub root_path_cost: u32,
    pub sender: BridgeId,
}

impl Bpdu {
    /// A BPDU announcing `bid` as the root, sent by the root itself.
    pub fn hello(bid: BridgeId) -> Bpdu {
        Bpdu {
            root: bid,
            root_path_cost: 0,
            sender: bid,
        }
    }

    /// Encodes the BPDU as a padded frame ready for the wire.
    pub fn to_frame(&self, source_address: MacAddress) -> Vec<u8> {
        let mut frame = build_bpdu_frame(
            BPDU_TYPE_FIELD,
            self.root.priority,
            self.root.mac,
            self.root_path_cost,
            self.sender.priority,
            self.sender.mac,
            source_address,
        );
        frame.resize(MIN_FRAME_LEN, 0x00);
        frame
    }

    pub fn from_frame(bytes: &[u8]) -> Result<Bpdu> {
        if bytes.len() < BPDU_FRAME_LEN {
            return Err(SwitchError::malformed(
                bytes.len(),
                "insufficient bytes for a BPDU",
            ));
        }

        let root_path_cost = u32::from_be_bytes([
            bytes[PATH_COST_OFFSET],
            bytes[PATH_COST_OFFSET + 1],
            bytes[PATH_COST_OFFSET + 2],
            bytes[PATH_COST_OFFSET + 3],
        ]);

        Ok(Bpdu {
            root: BridgeId::new(
                bytes[ROOT_PRIORITY_OFFSET],
                MacAddress(read_mac(bytes, ROOT_ID_OFFSET)),
            ),
            root_path_cost,
            sender: BridgeId::new(
                bytes[SENDER_PRIORITY_OFFSET],
                MacAddress(read_mac(bytes, SENDER_ID_OFFSET)),
            ),
        })
    }
}

/// Builds an unpadded BPDU frame.
/// * `length` - Literal value of the length field. Always `BPDU_TYPE_FIELD` for frames this switch emits.
/// * `own_mac` - Source address of the frame.
pub fn build_bpdu_frame(
    length: u16,
    root_priority: u8,
    root_id: MacAddress,
    path_cost: u32,
    sender_priority: u8,
    sender_id: MacAddress,
    own_mac: MacAddress,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BPDU_FRAME_LEN);

    bytes.extend_from_slice(&MacAddress::BPDU_MULTICAST.0);
    bytes.extend_from_slice(&own_mac.0);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(&LLC_HEADER);
    bytes.extend_from_slice(&PROTOCOL_BLOCK);

    bytes.push(root_priority);
    bytes.push(0x00);
    bytes.extend_from_slice(&root_id.0);
    bytes.extend_from_slice(&path_cost.to_be_bytes());
    bytes.push(sender_priority);
    bytes.push(0x00);
    bytes.extend_from_slice(&sender_id.0);
    bytes.extend_from_slice(&TRAILER);

    bytes
}
