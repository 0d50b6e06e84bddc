use std::collections::HashMap;

use crate::network::ethernet::MacAddress;

/// Maps a source address to the port it was last seen on.
///
/// Entries never expire; the latest sighting of an address wins.
#[derive(Debug, Default)]
pub struct MacTable {
    table: HashMap<MacAddress, usize>,
}

impl MacTable {
    pub fn new() -> MacTable {
        MacTable::default()
    }

    /// Records that `address` is reachable through `port`.
    /// Returns the port the address was previously mapped to, if it moved.
    pub fn learn(&mut self, address: MacAddress, port: usize) -> Option<usize> {
        match self.table.insert(address, port) {
            Some(previous) if previous != port => Some(previous),
            _ => None,
        }
    }

    pub fn lookup(&self, address: &MacAddress) -> Option<usize> {
        self.table.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
