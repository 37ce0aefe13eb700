use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::link_local_addr;

/// Outer envelope shared by every message on a neighbor link.
///
/// The wire form is `{"src", "dst", "type", "msg"}`; the tagged payload
/// carries the per-type shape.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Envelope {
    pub src: String,
    pub dst: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    /// A router-originated message on the link to `neighbor`: `src` is the
    /// local side of that link, `dst` the neighbor itself.
    pub fn to_neighbor(neighbor: Ipv4Addr, payload: Payload) -> Self {
        Envelope {
            src: link_local_addr(neighbor).to_string(),
            dst: neighbor.to_string(),
            payload,
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Envelope {} {} -> {}>",
            self.payload.kind(),
            self.src,
            self.dst
        )
    }
}

/// The six message kinds of the closed protocol. Anything else fails to
/// decode, which the dispatcher treats as fatal.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "msg")]
pub enum Payload {
    #[serde(rename = "data")]
    Data(Value),
    #[serde(rename = "dump")]
    Dump(Value),
    #[serde(rename = "update")]
    Update(RouteUpdate),
    #[serde(rename = "revoke")]
    Revoke(Vec<PrefixPair>),
    #[serde(rename = "table")]
    Table(Vec<TableEntry>),
    #[serde(rename = "no route")]
    NoRoute(Value),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        use Payload::*;
        match self {
            Data(_) => "data",
            Dump(_) => "dump",
            Update(_) => "update",
            Revoke(_) => "revoke",
            Table(_) => "table",
            NoRoute(_) => "no route",
        }
    }

    /// A `no route` reply; the payload object is empty.
    pub fn no_route() -> Self {
        Payload::NoRoute(Value::Object(Default::default()))
    }
}

/// Route fields of an `update` announcement, text prefix forms included.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RouteUpdate {
    pub network: String,
    pub netmask: String,
    pub localpref: u32,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    pub origin: Origin,
}

/// Route origin; variant order is preference order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Origin {
    #[serde(rename = "IGP")]
    Igp,
    #[serde(rename = "EGP")]
    Egp,
    #[serde(rename = "UNK")]
    Unk,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Origin::Igp => "IGP",
            Origin::Egp => "EGP",
            Origin::Unk => "UNK",
        };
        write!(f, "{}", word)
    }
}

/// One `(network, netmask)` pair of a `revoke` message.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PrefixPair {
    pub network: String,
    pub netmask: String,
}

/// One row of a `table` reply.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableEntry {
    pub network: String,
    pub netmask: String,
    pub peer: String,
}
