use std::collections::HashMap;
use std::net::Ipv4Addr;

use itertools::Itertools;

use crate::config::Relation;

/// Neighbors that should hear a route announcement or revocation heard
/// from `source`.
///
/// Announcements from customers go to every other neighbor; announcements
/// from peers and providers only reach customers. Targets come back in
/// address order so fan-out is deterministic.
pub fn forward_targets(
    relations: &HashMap<Ipv4Addr, Relation>,
    source: Ipv4Addr,
) -> Vec<Ipv4Addr> {
    let from_customer = relations.get(&source) == Some(&Relation::Customer);
    relations
        .iter()
        .filter(|(addr, _)| **addr != source)
        .filter(|(_, relation)| from_customer || **relation == Relation::Customer)
        .map(|(addr, _)| *addr)
        .sorted_by_key(|addr| u32::from(*addr))
        .collect()
}
