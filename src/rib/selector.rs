use std::collections::HashMap;
use std::net::Ipv4Addr;

use itertools::Itertools;

use super::{Rib, Route};
use crate::config::Relation;

/// Best next hop for a packet to `daddr` that arrived from `srcif`.
///
/// Pure function of the RIB: narrows the covering-route candidate set
/// through the preference hierarchy, orders survivors by neighbor
/// address, applies the relationship filter, and picks the most specific
/// surviving prefix. The filter runs after the tie-breaks, so a lone
/// survivor can still be filtered away.
pub fn best_route(
    rib: &Rib,
    relations: &HashMap<Ipv4Addr, Relation>,
    srcif: Ipv4Addr,
    daddr: Ipv4Addr,
) -> Option<Ipv4Addr> {
    let candidates: Vec<(Ipv4Addr, &Route)> = rib
        .iter()
        .filter(|(_, route)| route.prefix.contains(daddr))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    // Highest local preference
    let candidates = candidates
        .into_iter()
        .max_set_by_key(|(_, route)| route.localpref);

    // Self-originated routes shadow learned ones
    let (self_originated, learned): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|(_, route)| route.self_origin);
    let candidates = if self_originated.is_empty() {
        learned
    } else {
        self_originated
    };

    // Shortest AS path
    let candidates = candidates
        .into_iter()
        .min_set_by_key(|(_, route)| route.as_path.len());

    // Preferred origin: IGP over EGP over UNK
    let mut candidates = candidates
        .into_iter()
        .min_set_by_key(|(_, route)| route.origin);

    // Lowest neighbor address; establishes the ordering for the final pick
    candidates.sort_by_key(|(peer, _)| u32::from(*peer));

    // Routes heard from peers and providers only carry customer traffic
    if relations.get(&srcif) != Some(&Relation::Customer) {
        candidates.retain(|(peer, _)| relations.get(peer) == Some(&Relation::Customer));
    }

    // Most specific prefix wins; first in address order on a tie
    let mut best: Option<(Ipv4Addr, u8)> = None;
    for (peer, route) in candidates {
        let specificity = route.prefix.prefix();
        match best {
            Some((_, current)) if specificity <= current => (),
            _ => best = Some((peer, specificity)),
        }
    }
    best.map(|(peer, _)| peer)
}
