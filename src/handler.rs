use std::collections::HashMap;
use std::error;
use std::fmt;
use std::net::Ipv4Addr;

use log::{debug, info, trace, warn};

use crate::config::{ParseError, Relation, RouterConfig};
use crate::message::{Envelope, Payload, PrefixPair, RouteUpdate};
use crate::policy::forward_targets;
use crate::rib::{aggregate, best_route, Rib, Route};
use crate::session::{SessionError, SessionEvent, SessionManager};

#[derive(Debug)]
pub enum RouterError {
    /// Startup arguments could not be parsed
    Config(ParseError),
    /// Malformed or unexpected message; the protocol is closed. [reason]
    Decode(String),
    /// Frame arrived from an address with no configured neighbor
    UnknownNeighbor(Ipv4Addr),
    /// Transport-level failure on a neighbor link
    Session(SessionError),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RouterError::*;
        match self {
            Config(err) => write!(f, "Config error: {}", err),
            Decode(reason) => write!(f, "Decode error: {}", reason),
            UnknownNeighbor(addr) => write!(f, "Unknown neighbor {}", addr),
            Session(err) => write!(f, "{}", err),
        }
    }
}

impl error::Error for RouterError {}

impl From<ParseError> for RouterError {
    fn from(error: ParseError) -> Self {
        RouterError::Config(error)
    }
}

impl From<SessionError> for RouterError {
    fn from(error: SessionError) -> Self {
        RouterError::Session(error)
    }
}

/// An outbound message produced by a handler: either a router-originated
/// envelope or a verbatim frame being transparently forwarded.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    Message(Ipv4Addr, Envelope),
    Verbatim(Ipv4Addr, String),
}

impl Outgoing {
    pub fn neighbor(&self) -> Ipv4Addr {
        match self {
            Outgoing::Message(addr, _) => *addr,
            Outgoing::Verbatim(addr, _) => *addr,
        }
    }
}

/// Core engine: routing state plus the per-message handlers.
///
/// Handlers mutate the RIB and return the messages to emit; the transport
/// stays in `SessionManager`, which keeps the engine testable without
/// sockets.
pub struct Router {
    asn: u32,
    relations: HashMap<Ipv4Addr, Relation>,
    rib: Rib,
}

impl Router {
    pub fn new(config: &RouterConfig) -> Self {
        Router {
            asn: config.asn,
            relations: config.relations(),
            rib: Rib::new(),
        }
    }

    pub fn rib(&self) -> &Rib {
        &self.rib
    }

    /// Decode one frame from `peer` and dispatch to the matching handler.
    pub fn handle_frame(
        &mut self,
        peer: Ipv4Addr,
        frame: &str,
    ) -> Result<Vec<Outgoing>, RouterError> {
        if !self.relations.contains_key(&peer) {
            return Err(RouterError::UnknownNeighbor(peer));
        }
        let envelope: Envelope = serde_json::from_str(frame)
            .map_err(|err| RouterError::Decode(format!("{} in frame from {}", err, peer)))?;
        let kind = envelope.payload.kind();
        trace!("[{}] Incoming: {}", peer, kind);
        match envelope.payload {
            Payload::Data(_) => self.handle_data(peer, &envelope.dst, frame),
            Payload::Update(update) => self.handle_update(peer, update),
            Payload::Revoke(withdrawn) => self.handle_revoke(peer, withdrawn),
            Payload::Dump(_) => Ok(self.handle_dump(peer)),
            // These only ever travel away from the router
            Payload::Table(_) | Payload::NoRoute(_) => Err(RouterError::Decode(format!(
                "Unexpected '{}' message from {}",
                kind, peer
            ))),
        }
    }

    /// Forward a data packet along the best route, or bounce a `no route`
    /// reply to the source. The only per-packet error surfaced upstream.
    fn handle_data(
        &mut self,
        srcif: Ipv4Addr,
        dst: &str,
        frame: &str,
    ) -> Result<Vec<Outgoing>, RouterError> {
        let daddr: Ipv4Addr = dst
            .parse()
            .map_err(|err| RouterError::Decode(format!("{} '{}' from {}", err, dst, srcif)))?;
        match best_route(&self.rib, &self.relations, srcif, daddr) {
            Some(next_hop) => {
                debug!("Forwarding data for {} via {}", daddr, next_hop);
                Ok(vec![Outgoing::Verbatim(next_hop, frame.to_string())])
            }
            None => {
                warn!("No route for {} from {}", daddr, srcif);
                Ok(vec![Outgoing::Message(
                    srcif,
                    Envelope::to_neighbor(srcif, Payload::no_route()),
                )])
            }
        }
    }

    /// Log the announcement, learn the route, fan out per policy with the
    /// local ASN appended to the path.
    fn handle_update(
        &mut self,
        peer: Ipv4Addr,
        update: RouteUpdate,
    ) -> Result<Vec<Outgoing>, RouterError> {
        let route = Route::from_update(&update)
            .map_err(|err| RouterError::Decode(format!("{} from {}", err.reason, peer)))?;
        debug!(
            "Learned {}/{} from {} ({})",
            update.network, update.netmask, peer, route
        );
        self.rib.record_update(peer, update.clone());
        self.rib.insert(peer, route);

        let mut forwarded = update;
        forwarded.as_path.push(self.asn);
        Ok(forward_targets(&self.relations, peer)
            .into_iter()
            .map(|target| {
                Outgoing::Message(
                    target,
                    Envelope::to_neighbor(target, Payload::Update(forwarded.clone())),
                )
            })
            .collect())
    }

    /// Log the revocation, drop the matching routes, fan out the withdrawn
    /// list verbatim per policy.
    fn handle_revoke(
        &mut self,
        peer: Ipv4Addr,
        withdrawn: Vec<PrefixPair>,
    ) -> Result<Vec<Outgoing>, RouterError> {
        debug!("Revoking {} prefixes from {}", withdrawn.len(), peer);
        self.rib.record_revocation(peer, withdrawn.clone());
        self.rib.withdraw(peer, &withdrawn);

        Ok(forward_targets(&self.relations, peer)
            .into_iter()
            .map(|target| {
                Outgoing::Message(
                    target,
                    Envelope::to_neighbor(target, Payload::Revoke(withdrawn.clone())),
                )
            })
            .collect())
    }

    /// Reply with the aggregated forwarding table.
    fn handle_dump(&self, peer: Ipv4Addr) -> Vec<Outgoing> {
        let table = aggregate(&self.rib);
        debug!("Dumping {} table entries for {}", table.len(), peer);
        vec![Outgoing::Message(
            peer,
            Envelope::to_neighbor(peer, Payload::Table(table)),
        )]
    }
}

/// Single-threaded event loop: multiplex the neighbor links, dispatch each
/// frame, and emit every induced message before the next receive.
pub async fn serve(config: RouterConfig) -> Result<(), RouterError> {
    let mut manager = SessionManager::connect(&config).await?;
    info!("Router AS{} up with {} neighbor links", config.asn, manager.len());
    let mut router = Router::new(&config);

    loop {
        match manager.poll().await {
            // A failed read is a supervisor-initiated shutdown, like a close
            Err(err) => {
                warn!("{}, shutting down", err);
                break;
            }
            // Idle tick
            Ok(None) => continue,
            Ok(Some(SessionEvent::Closed(addr))) => {
                info!("Link to {} closed, shutting down", addr);
                break;
            }
            Ok(Some(SessionEvent::Frame(peer, frame))) => {
                for outgoing in router.handle_frame(peer, &frame)? {
                    match outgoing {
                        Outgoing::Message(to, envelope) => manager.send(to, &envelope).await?,
                        Outgoing::Verbatim(to, frame) => manager.send_raw(to, frame).await?,
                    }
                }
            }
        }
    }

    for session in manager.sessions() {
        debug!("{}", session);
    }
    Ok(())
}
