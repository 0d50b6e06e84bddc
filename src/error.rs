use thiserror::Error;

/// Result type alias for switch operations
pub type Result<T> = std::result::Result<T, SwitchError>;

#[derive(Error, Debug)]
pub enum SwitchError {
    /// A frame too short (or otherwise unreadable) to be switched.
    #[error("Malformed frame ({len} bytes): {reason}")]
    MalformedFrame { len: usize, reason: &'static str },

    /// A forwarding decision or transport call referenced a port that doesn't exist.
    #[error("Port {0} is out of range")]
    UnknownPort(usize),

    /// The transport refuses frames at or above its maximum size.
    #[error("Frame of {0} bytes exceeds the transport limit")]
    FrameTooLarge(usize),

    /// Send or receive failed at the link boundary.
    #[error("Link transport failure: {0}")]
    Transport(String),

    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is unusable; the switch refuses to start.
    #[error("Configuration error on line {line}: {reason}")]
    Config { line: usize, reason: String },
}

impl SwitchError {
    pub fn malformed(len: usize, reason: &'static str) -> Self {
        SwitchError::MalformedFrame { len, reason }
    }

    pub fn config<S: Into<String>>(line: usize, reason: S) -> Self {
        SwitchError::Config {
            line,
            reason: reason.into(),
        }
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        SwitchError::Transport(msg.into())
    }

    /// True for errors scoped to a single frame or forwarding action.
    /// The core loop drops the frame and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SwitchError::MalformedFrame { .. }
                | SwitchError::UnknownPort(_)
                | SwitchError::FrameTooLarge(_)
        )
    }
}
