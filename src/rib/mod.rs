pub mod aggregate;
pub mod selector;

pub use aggregate::aggregate;
pub use selector::best_route;

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use log::trace;

use crate::config::ParseError;
use crate::message::{Origin, PrefixPair, RouteUpdate};

/// A route learned from a neighbor, parsed once at ingress.
///
/// The prefix is kept as a validated `Ipv4Network`; the announced text
/// forms stay alongside for exact-match withdrawal and for echoing in
/// outgoing messages.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub prefix: Ipv4Network,
    pub localpref: u32,
    pub self_origin: bool,
    pub as_path: Vec<u32>,
    pub origin: Origin,
    pub network: String,
    pub netmask: String,
}

impl Route {
    pub fn from_update(update: &RouteUpdate) -> Result<Self, ParseError> {
        let addr: Ipv4Addr = update
            .network
            .parse()
            .map_err(|err| ParseError::new(format!("{} '{}'", err, update.network)))?;
        let mask: Ipv4Addr = update
            .netmask
            .parse()
            .map_err(|err| ParseError::new(format!("{} '{}'", err, update.netmask)))?;
        // Rejects non-contiguous masks
        let prefix = Ipv4Network::with_netmask(addr, mask)
            .map_err(|err| ParseError::new(format!("{} '{}'", err, update.netmask)))?;
        Ok(Route {
            prefix,
            localpref: update.localpref,
            self_origin: update.self_origin,
            as_path: update.as_path.clone(),
            origin: update.origin,
            network: update.network.clone(),
            netmask: update.netmask.clone(),
        })
    }

    /// True when both routes carry identical path attributes.
    pub fn same_attributes(&self, other: &Route) -> bool {
        self.localpref == other.localpref
            && self.self_origin == other.self_origin
            && self.as_path == other.as_path
            && self.origin == other.origin
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Route {} localpref={} origin={}>",
            self.prefix, self.localpref, self.origin
        )
    }
}

/// Verbatim record of one received announcement.
#[derive(Clone, Debug)]
pub struct UpdateLogEntry {
    pub timestamp: DateTime<Utc>,
    pub peer: Ipv4Addr,
    pub update: RouteUpdate,
}

/// Verbatim record of one received revocation.
#[derive(Clone, Debug)]
pub struct RevocationLogEntry {
    pub timestamp: DateTime<Utc>,
    pub peer: Ipv4Addr,
    pub withdrawn: Vec<PrefixPair>,
}

/// Routing Information Base: every route currently known, keyed by the
/// neighbor it was learned from, plus the append-only update and
/// revocation logs. The logs are never consulted for selection; they are
/// kept so revocations can be audited and replayed.
#[derive(Debug, Default)]
pub struct Rib {
    routes: HashMap<Ipv4Addr, Vec<Route>>,
    updates: Vec<UpdateLogEntry>,
    revocations: Vec<RevocationLogEntry>,
}

impl Rib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a learned route. Duplicate announcements append again;
    /// de-duplication is the aggregator's job at dump time.
    pub fn insert(&mut self, peer: Ipv4Addr, route: Route) {
        self.routes.entry(peer).or_insert_with(Vec::new).push(route);
    }

    /// Drop every route under `peer` whose announced `(network, netmask)`
    /// text matches a withdrawn pair exactly.
    pub fn withdraw(&mut self, peer: Ipv4Addr, withdrawn: &[PrefixPair]) {
        if let Some(routes) = self.routes.get_mut(&peer) {
            let before = routes.len();
            routes.retain(|route| {
                !withdrawn
                    .iter()
                    .any(|pair| pair.network == route.network && pair.netmask == route.netmask)
            });
            trace!("Withdrew {} routes for {}", before - routes.len(), peer);
        }
    }

    /// Routes learned from `peer`, in arrival order; empty when none.
    pub fn routes_of(&self, peer: Ipv4Addr) -> &[Route] {
        self.routes.get(&peer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ipv4Addr, &Route)> {
        self.routes
            .iter()
            .flat_map(|(peer, routes)| routes.iter().map(move |route| (*peer, route)))
    }

    pub fn neighbors(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.routes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_update(&mut self, peer: Ipv4Addr, update: RouteUpdate) {
        self.updates.push(UpdateLogEntry {
            timestamp: Utc::now(),
            peer,
            update,
        });
    }

    pub fn record_revocation(&mut self, peer: Ipv4Addr, withdrawn: Vec<PrefixPair>) {
        self.revocations.push(RevocationLogEntry {
            timestamp: Utc::now(),
            peer,
            withdrawn,
        });
    }

    pub fn update_log(&self) -> &[UpdateLogEntry] {
        &self.updates
    }

    pub fn revocation_log(&self) -> &[RevocationLogEntry] {
        &self.revocations
    }
}
