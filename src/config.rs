use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: String) -> Self {
        ParseError { reason }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {}", self.reason)
    }
}

impl Error for ParseError {}

/// Commercial relationship on a neighbor link, governing which
/// announcements the neighbor may hear and whose traffic it may send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Customer,
    Peer,
    Provider,
}

impl FromStr for Relation {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, ParseError> {
        match value {
            "cust" => Ok(Relation::Customer),
            "peer" => Ok(Relation::Peer),
            "prov" => Ok(Relation::Provider),
            _ => Err(ParseError::new(format!("Unknown relation '{}'", value))),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Relation::Customer => "customer",
            Relation::Peer => "peer",
            Relation::Provider => "provider",
        };
        write!(f, "{}", word)
    }
}

/// One `<address>-<relation>` startup argument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborConfig {
    pub addr: Ipv4Addr,
    pub relation: Relation,
}

impl FromStr for NeighborConfig {
    type Err = ParseError;

    fn from_str(spec: &str) -> Result<Self, ParseError> {
        let (addr, relation) = spec
            .rsplit_once('-')
            .ok_or_else(|| ParseError::new(format!("Not a valid neighbor spec: '{}'", spec)))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|err| ParseError::new(format!("{} '{}'", err, spec)))?;
        let relation = relation.parse()?;
        Ok(NeighborConfig { addr, relation })
    }
}

impl fmt::Display for NeighborConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Neighbor {} relation={}>", self.addr, self.relation)
    }
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub asn: u32,
    pub port: u16,
    pub neighbors: Vec<NeighborConfig>,
}

impl RouterConfig {
    pub fn from_args(asn: &str, port: u16, neighbors: &[&str]) -> Result<Self, ParseError> {
        let asn: u32 = asn
            .parse()
            .map_err(|err| ParseError::new(format!("{} '{}'", err, asn)))?;
        let mut parsed: Vec<NeighborConfig> = Vec::with_capacity(neighbors.len());
        let mut seen: HashSet<Ipv4Addr> = HashSet::with_capacity(neighbors.len());
        for spec in neighbors {
            let neighbor: NeighborConfig = spec.parse()?;
            if !seen.insert(neighbor.addr) {
                return Err(ParseError::new(format!(
                    "Duplicate neighbor address '{}'",
                    neighbor.addr
                )));
            }
            parsed.push(neighbor);
        }
        Ok(RouterConfig {
            asn,
            port,
            neighbors: parsed,
        })
    }

    /// Relationship lookup table keyed by neighbor address.
    pub fn relations(&self) -> HashMap<Ipv4Addr, Relation> {
        self.neighbors
            .iter()
            .map(|n| (n.addr, n.relation))
            .collect()
    }
}
