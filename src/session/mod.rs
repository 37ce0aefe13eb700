mod codec;
mod manager;
mod message_counts;

pub use codec::{MessageCodec, MessageProtocol, MAX_FRAME_LEN};
pub use manager::{Session, SessionManager};
use message_counts::MessageCounts;

use std::error;
use std::fmt;
use std::io;
use std::net::Ipv4Addr;

/// One occurrence on the merged stream of neighbor links.
#[derive(Debug)]
pub enum SessionEvent {
    /// One framed message, verbatim, from a neighbor
    Frame(Ipv4Addr, String),
    /// The remote side closed the link
    Closed(Ipv4Addr),
}

#[derive(Debug)]
pub enum SessionError {
    /// Something happened in transport. [reason]
    TransportError(String),
    /// Frame addressed to a neighbor with no link. [neighbor]
    UnknownNeighbor(Ipv4Addr),
    /// Some other issue happened. [reason]
    Other(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session Error: ")?;
        use SessionError::*;
        match self {
            TransportError(reason) => write!(f, "Transport error [{}]", reason)?,
            UnknownNeighbor(addr) => write!(f, "No link to {}", addr)?,
            Other(reason) => write!(f, "{}", reason)?,
        }
        Ok(())
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::TransportError(error.to_string())
    }
}

impl error::Error for SessionError {}
