pub mod bpdu;
pub mod vlan;

use std::{fmt, str::FromStr};

use crate::error::{Result, SwitchError};

/// A data link physical address
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    /// Reserved multicast address every BPDU is sent to
    pub const BPDU_MULTICAST: MacAddress = MacAddress([0x01, 0x80, 0xC2, 0x00, 0x00, 0x00]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddress::BROADCAST
    }

    /// Returns true if the address is a multicast or broadcast address
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    /// A random, locally administered unicast address.
    pub fn random_local() -> MacAddress {
        let mut octets: [u8; 6] = rand::random();
        octets[0] = (octets[0] & 0xFE) | 0x02;
        MacAddress(octets)
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("'{}' is not a colon separated MAC address", s));
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| format!("'{}' is not a hex octet", part))?;
        }
        Ok(MacAddress(octets))
    }
}

/// Creates a unicast MAC address from a u64
#[macro_export]
macro_rules! mac_addr {
    ($num:expr) => {{
        let num = $num as u64;
        $crate::network::ethernet::MacAddress([
            (((num >> 40) & 0xff) as u8 & 0xFE), // Clear the least significant bit to avoid multicast
            ((num >> 32) & 0xff) as u8,
            ((num >> 24) & 0xff) as u8,
            ((num >> 16) & 0xff) as u8,
            ((num >> 8) & 0xff) as u8,
            (num & 0xff) as u8,
        ])
    }};
}

/// 802.1Q style tag marker. This network uses 0x8200 rather than the standard 0x8100.
pub const TAG_MARKER: u16 = 0x8200;

/// Literal value in the type/length field marking a BPDU.
pub const BPDU_TYPE_FIELD: u16 = 38;

pub const HEADER_LEN: usize = 14;
pub const TAG_LEN: usize = 4;

pub type VlanId = u16;

/// Highest VLAN id a port may be configured with.
pub const MAX_VLAN_ID: VlanId = 4094;

/// The fixed-offset fields at the start of every frame.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct EthernetHeader {
    pub destination_address: MacAddress,
    pub source_address: MacAddress,
    /// The real ethertype/length; for tagged frames, the field following the tag.
    pub ether_type: u16,
    /// None if the frame carries no tag.
    pub vlan_id: Option<VlanId>,
}

impl EthernetHeader {
    pub fn parse(bytes: &[u8]) -> Result<EthernetHeader> {
        if bytes.len() < HEADER_LEN {
            return Err(SwitchError::malformed(
                bytes.len(),
                "insufficient bytes for an Ethernet header; runt frame",
            ));
        }

        let destination_address = MacAddress(read_mac(bytes, 0));
        let source_address = MacAddress(read_mac(bytes, 6));
        let type_field = u16::from_be_bytes([bytes[12], bytes[13]]);

        if type_field != TAG_MARKER {
            return Ok(EthernetHeader {
                destination_address,
                source_address,
                ether_type: type_field,
                vlan_id: None,
            });
        }

        if bytes.len() < HEADER_LEN + TAG_LEN {
            return Err(SwitchError::malformed(
                bytes.len(),
                "tag marker present but the tag is truncated",
            ));
        }

        let tci = u16::from_be_bytes([bytes[14], bytes[15]]);
        Ok(EthernetHeader {
            destination_address,
            source_address,
            ether_type: u16::from_be_bytes([bytes[16], bytes[17]]),
            vlan_id: Some(tci & 0x0FFF),
        })
    }

    pub fn is_bpdu(&self) -> bool {
        self.vlan_id.is_none() && self.ether_type == BPDU_TYPE_FIELD
    }
}

pub(crate) fn read_mac(bytes: &[u8], offset: usize) -> [u8; 6] {
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&bytes[offset..offset + 6]);
    mac
}

/// Builds an untagged frame with the given addresses, ethertype and payload.
pub fn ethernet_frame(
    destination_address: MacAddress,
    source_address: MacAddress,
    ether_type: u16,
    data: &[u8],
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + data.len());
    bytes.extend_from_slice(&destination_address.0);
    bytes.extend_from_slice(&source_address.0);
    bytes.extend_from_slice(&ether_type.to_be_bytes());
    bytes.extend_from_slice(data);
    bytes
}

/// Creates a generic ethernet payload with a given value
#[cfg(test)]
#[macro_export]
macro_rules! eth_data {
    ($value:expr) => {{
        vec![$value as u8; 46]
    }};
}
