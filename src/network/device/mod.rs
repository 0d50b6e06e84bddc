pub mod mac_table;
pub mod stp;
pub mod switch;

/// A frame the switch has decided to transmit, and the port it leaves through.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Egress {
    pub port: usize,
    pub frame: Vec<u8>,
}

impl Egress {
    pub fn new(port: usize, frame: Vec<u8>) -> Egress {
        Egress { port, frame }
    }
}
