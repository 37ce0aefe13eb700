use ipnetwork::Ipv4Network;
use itertools::Itertools;

use super::{Rib, Route};
use crate::message::TableEntry;

/// Coalesce numerically adjacent same-attribute routes into shorter
/// prefixes for a table dump.
///
/// Pure function of the RIB: each neighbor's routes are copied, sorted by
/// numeric prefix and swept pairwise until a full pass merges nothing.
/// Output rows are ordered by `(peer, network, netmask)`.
pub fn aggregate(rib: &Rib) -> Vec<TableEntry> {
    let mut entries: Vec<TableEntry> = Vec::with_capacity(rib.len());
    for peer in rib.neighbors().sorted_by_key(|addr| u32::from(*addr)) {
        let mut routes: Vec<Route> = rib.routes_of(peer).to_vec();
        loop {
            routes.sort_by_key(|route| (u32::from(route.prefix.network()), route.prefix.prefix()));
            // Repeated announcements collapse to one row at dump time
            routes.dedup_by(|a, b| a.prefix == b.prefix && a.same_attributes(b));
            if !sweep(&mut routes) {
                break;
            }
        }
        entries.extend(routes.into_iter().map(|route| TableEntry {
            network: route.prefix.network().to_string(),
            netmask: route.prefix.mask().to_string(),
            peer: peer.to_string(),
        }));
    }
    entries
}

/// One pairwise pass over a sorted route list; true when anything merged.
fn sweep(routes: &mut Vec<Route>) -> bool {
    let mut merged = false;
    let mut i = 0;
    while i + 1 < routes.len() {
        if let Some(combined) = merge_pair(&routes[i], &routes[i + 1]) {
            routes[i] = combined;
            routes.remove(i + 1);
            merged = true;
        } else {
            i += 1;
        }
    }
    merged
}

/// Two routes combine when they share netmask and attributes and their
/// networks differ only in the mask-length-th bit from the MSB.
fn merge_pair(a: &Route, b: &Route) -> Option<Route> {
    let m = a.prefix.prefix();
    if m == 0 || m != b.prefix.prefix() || !a.same_attributes(b) {
        return None;
    }
    let lower = u32::from(a.prefix.network());
    let upper = u32::from(b.prefix.network());
    let pair_bit = 1u32 << (32 - m);
    if lower ^ upper != pair_bit {
        return None;
    }
    let prefix = Ipv4Network::new(a.prefix.network(), m - 1).ok()?;
    Some(Route {
        prefix,
        network: prefix.network().to_string(),
        netmask: prefix.mask().to_string(),
        ..a.clone()
    })
}
