//! The byte pipes between the switch and the outside world.

pub mod cable;
pub mod raw;

use crate::{error::Result, network::ethernet::MacAddress};

/// Frames of this size or larger are refused by every transport.
pub const MAX_FRAME_LEN: usize = 1600;

/// Delivers and accepts whole frames on a fixed set of numbered ports.
pub trait LinkTransport: Send + Sync {
    /// Ports are numbered `0..port_count()`.
    fn port_count(&self) -> usize;

    /// Blocks until a frame arrives on some port.
    fn receive_from_any_port(&self) -> Result<(usize, Vec<u8>)>;

    /// Fails with `FrameTooLarge` when `frame.len() >= MAX_FRAME_LEN` and with
    /// `UnknownPort` when `port` is out of range.
    fn send_to_port(&self, port: usize, frame: &[u8]) -> Result<()>;

    fn own_mac(&self) -> MacAddress;

    /// Diagnostic name of a port.
    fn port_name(&self, port: usize) -> String;
}

/// Checks shared by every transport before a frame is sent.
pub(crate) fn check_send(port_count: usize, port: usize, frame: &[u8]) -> Result<()> {
    use crate::error::SwitchError;

    if port >= port_count {
        return Err(SwitchError::UnknownPort(port));
    }
    if frame.len() >= MAX_FRAME_LEN {
        return Err(SwitchError::FrameTooLarge(frame.len()));
    }
    Ok(())
}
