use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;

use futures::stream::{self, SelectAll, SplitSink, Stream, StreamExt};
use futures::SinkExt;
use log::{debug, trace};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_util::codec::Framed;

use super::{MessageCodec, MessageCounts, MessageProtocol, SessionError, SessionEvent};
use crate::config::RouterConfig;
use crate::message::Envelope;

/// Readiness wait per event-loop iteration.
const READ_TIMEOUT_MS: u64 = 100;

/// A link's read half, tagged with its neighbor address and terminated by
/// a `None` sentinel so a remote close is observable on the merged stream.
type LinkStream = Pin<Box<dyn Stream<Item = (Ipv4Addr, Option<Result<String, io::Error>>)>>>;

/// Send half and frame counters for one neighbor link.
pub struct Session {
    addr: Ipv4Addr,
    sink: SplitSink<MessageProtocol, String>,
    counts: MessageCounts,
}

impl Session {
    async fn send(&mut self, frame: String) -> Result<(), SessionError> {
        self.sink.send(frame).await?;
        self.counts.record_out();
        Ok(())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Session {} {}>", self.addr, self.counts)
    }
}

/// Owns every neighbor link: the split send halves plus one merged stream
/// of tagged incoming frames.
pub struct SessionManager {
    sessions: HashMap<Ipv4Addr, Session>,
    incoming: SelectAll<LinkStream>,
}

impl SessionManager {
    /// Open one framed connection per configured neighbor.
    pub async fn connect(config: &RouterConfig) -> Result<Self, SessionError> {
        let mut sessions = HashMap::with_capacity(config.neighbors.len());
        let mut incoming = SelectAll::new();
        for neighbor in &config.neighbors {
            let addr = neighbor.addr;
            let stream = TcpStream::connect(SocketAddr::from((addr, config.port))).await?;
            debug!("Connected to {} ({})", addr, neighbor.relation);
            let (sink, frames) = Framed::new(stream, MessageCodec::new()).split();
            let tagged = frames
                .map(move |frame| (addr, Some(frame)))
                .chain(stream::once(async move { (addr, None) }));
            incoming.push(Box::pin(tagged) as LinkStream);
            sessions.insert(
                addr,
                Session {
                    addr,
                    sink,
                    counts: MessageCounts::new(),
                },
            );
        }
        Ok(SessionManager { sessions, incoming })
    }

    /// Wait up to the readiness timeout for one frame on any link.
    /// `Ok(None)` is an idle tick.
    pub async fn poll(&mut self) -> Result<Option<SessionEvent>, SessionError> {
        match timeout(Duration::from_millis(READ_TIMEOUT_MS), self.incoming.next()).await {
            Err(_) => Ok(None),
            Ok(Some((addr, Some(Ok(frame))))) => {
                trace!("[{}] Incoming frame ({} bytes)", addr, frame.len());
                if let Some(session) = self.sessions.get_mut(&addr) {
                    session.counts.record_in();
                }
                Ok(Some(SessionEvent::Frame(addr, frame)))
            }
            Ok(Some((addr, Some(Err(err))))) => Err(SessionError::TransportError(format!(
                "{}: {}",
                addr, err
            ))),
            Ok(Some((addr, None))) => Ok(Some(SessionEvent::Closed(addr))),
            Ok(None) => Err(SessionError::Other("All links closed".to_string())),
        }
    }

    pub async fn send(&mut self, to: Ipv4Addr, envelope: &Envelope) -> Result<(), SessionError> {
        let frame = serde_json::to_string(envelope)
            .map_err(|err| SessionError::Other(format!("Encoding {}: {}", envelope, err)))?;
        self.send_raw(to, frame).await
    }

    /// Send one pre-framed message verbatim.
    pub async fn send_raw(&mut self, to: Ipv4Addr, frame: String) -> Result<(), SessionError> {
        trace!("[{}] Outgoing frame ({} bytes)", to, frame.len());
        let session = self
            .sessions
            .get_mut(&to)
            .ok_or(SessionError::UnknownNeighbor(to))?;
        session.send(frame).await
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
