//! Message-level scenarios driving the router core end to end.

use std::net::Ipv4Addr;

use serde_json::json;

use routerd::config::RouterConfig;
use routerd::handler::{Outgoing, Router};
use routerd::message::{Envelope, Payload};
use routerd::utils::link_local_addr;

fn router(neighbors: &[&str]) -> Router {
    Router::new(&RouterConfig::from_args("7", 179, neighbors).unwrap())
}

fn addr(text: &str) -> Ipv4Addr {
    text.parse().unwrap()
}

fn local(peer: &str) -> String {
    link_local_addr(addr(peer)).to_string()
}

fn update_frame(peer: &str, network: &str, netmask: &str, as_path: &[u32]) -> String {
    json!({
        "src": peer,
        "dst": local(peer),
        "type": "update",
        "msg": {
            "network": network,
            "netmask": netmask,
            "localpref": 100,
            "selfOrigin": false,
            "ASPath": as_path,
            "origin": "IGP",
        }
    })
    .to_string()
}

fn data_frame(src: &str, dst: &str) -> String {
    json!({
        "src": src,
        "dst": dst,
        "type": "data",
        "msg": {"seq": 1},
    })
    .to_string()
}

fn dump_frame(peer: &str) -> String {
    json!({
        "src": peer,
        "dst": local(peer),
        "type": "dump",
        "msg": {},
    })
    .to_string()
}

fn revoke_frame(peer: &str, pairs: &[(&str, &str)]) -> String {
    let withdrawn: Vec<_> = pairs
        .iter()
        .map(|(network, netmask)| json!({"network": network, "netmask": netmask}))
        .collect();
    json!({
        "src": peer,
        "dst": local(peer),
        "type": "revoke",
        "msg": withdrawn,
    })
    .to_string()
}

fn learn(router: &mut Router, peer: &str, network: &str, netmask: &str, as_path: &[u32]) {
    router
        .handle_frame(addr(peer), &update_frame(peer, network, netmask, as_path))
        .unwrap();
}

#[test]
fn s1_data_is_forwarded_verbatim_along_learned_route() {
    let mut router = router(&["192.168.0.2-cust", "172.16.0.2-cust"]);
    learn(&mut router, "192.168.0.2", "192.168.0.0", "255.255.255.0", &[1]);

    let frame = data_frame("172.16.0.9", "192.168.0.25");
    let outgoing = router.handle_frame(addr("172.16.0.2"), &frame).unwrap();
    assert_eq!(
        outgoing,
        vec![Outgoing::Verbatim(addr("192.168.0.2"), frame)]
    );
}

#[test]
fn s2_peer_route_is_unusable_for_provider_traffic() {
    let mut router = router(&["10.0.1.2-peer", "10.0.2.2-cust", "10.0.3.2-prov"]);
    learn(&mut router, "10.0.1.2", "10.0.0.0", "255.0.0.0", &[1]);

    // Provider-sourced packet bounces with `no route`
    let outgoing = router
        .handle_frame(addr("10.0.3.2"), &data_frame("10.0.3.9", "10.0.0.1"))
        .unwrap();
    match &outgoing[..] {
        [Outgoing::Message(to, envelope)] => {
            assert_eq!(*to, addr("10.0.3.2"));
            assert_eq!(envelope.src, "10.0.3.1");
            assert_eq!(envelope.dst, "10.0.3.2");
            assert_eq!(envelope.payload, Payload::no_route());
        }
        _ => panic!(),
    }

    // The same destination is reachable for customer traffic
    let frame = data_frame("10.0.2.9", "10.0.0.1");
    let outgoing = router.handle_frame(addr("10.0.2.2"), &frame).unwrap();
    assert_eq!(outgoing, vec![Outgoing::Verbatim(addr("10.0.1.2"), frame)]);
}

#[test]
fn s3_relationship_filter_overrides_tie_break_winner() {
    let mut router = router(&["10.0.1.2-peer", "10.0.2.2-cust", "10.0.3.2-prov"]);
    // Identical announcements; the peer X wins the lowest-address
    // tie-break, the customer Y survives the relationship filter
    learn(&mut router, "10.0.1.2", "10.0.0.0", "255.0.0.0", &[1]);
    learn(&mut router, "10.0.2.2", "10.0.0.0", "255.0.0.0", &[2]);

    let frame = data_frame("10.0.3.9", "10.0.0.1");
    let outgoing = router.handle_frame(addr("10.0.3.2"), &frame).unwrap();
    assert_eq!(outgoing, vec![Outgoing::Verbatim(addr("10.0.2.2"), frame)]);

    // From a customer source the tie-break winner stands
    let frame = data_frame("10.0.2.9", "10.0.0.1");
    let outgoing = router.handle_frame(addr("10.0.2.2"), &frame).unwrap();
    assert_eq!(outgoing, vec![Outgoing::Verbatim(addr("10.0.1.2"), frame)]);
}

#[test]
fn s4_most_specific_prefix_forwards_last() {
    let mut router = router(&["10.0.1.2-cust", "10.0.2.2-cust", "10.0.3.2-cust"]);
    // Equal-length paths and matching attributes so both routes survive
    // the tie-breaks and the most-specific stage decides
    learn(&mut router, "10.0.1.2", "10.0.0.0", "255.0.0.0", &[1]);
    learn(&mut router, "10.0.2.2", "10.0.0.0", "255.255.255.0", &[2]);

    // Inside the /24 the more specific route wins
    let frame = data_frame("10.0.3.9", "10.0.0.5");
    let outgoing = router.handle_frame(addr("10.0.3.2"), &frame).unwrap();
    assert_eq!(outgoing, vec![Outgoing::Verbatim(addr("10.0.2.2"), frame)]);

    // Outside it only the /8 covers
    let frame = data_frame("10.0.3.9", "10.0.99.5");
    let outgoing = router.handle_frame(addr("10.0.3.2"), &frame).unwrap();
    assert_eq!(outgoing, vec![Outgoing::Verbatim(addr("10.0.1.2"), frame)]);
}

#[test]
fn s5_customer_update_fans_out_with_asn_appended() {
    let mut router = router(&["10.0.1.2-cust", "10.0.2.2-peer", "10.0.3.2-prov"]);
    let outgoing = router
        .handle_frame(
            addr("10.0.1.2"),
            &update_frame("10.0.1.2", "172.16.0.0", "255.255.0.0", &[12]),
        )
        .unwrap();

    assert_eq!(outgoing.len(), 2);
    let targets: Vec<Ipv4Addr> = outgoing.iter().map(Outgoing::neighbor).collect();
    assert_eq!(targets, vec![addr("10.0.2.2"), addr("10.0.3.2")]);
    for out in &outgoing {
        match out {
            Outgoing::Message(to, envelope) => {
                assert_eq!(envelope.src, link_local_addr(*to).to_string());
                assert_eq!(envelope.dst, to.to_string());
                match &envelope.payload {
                    Payload::Update(update) => {
                        assert_eq!(update.network, "172.16.0.0");
                        assert_eq!(update.as_path, vec![12, 7]);
                    }
                    _ => panic!(),
                }
            }
            _ => panic!(),
        }
    }
}

#[test]
fn s5b_peer_update_fans_out_to_customers_only() {
    let mut router = router(&["10.0.1.2-cust", "10.0.2.2-peer", "10.0.3.2-prov"]);
    let outgoing = router
        .handle_frame(
            addr("10.0.2.2"),
            &update_frame("10.0.2.2", "172.16.0.0", "255.255.0.0", &[21]),
        )
        .unwrap();

    let targets: Vec<Ipv4Addr> = outgoing.iter().map(Outgoing::neighbor).collect();
    assert_eq!(targets, vec![addr("10.0.1.2")]);
}

#[test]
fn s6_dump_replies_with_coalesced_table() {
    let mut router = router(&["192.168.0.2-cust", "172.16.0.2-cust"]);
    learn(&mut router, "192.168.0.2", "192.168.0.0", "255.255.255.0", &[1]);
    learn(&mut router, "192.168.0.2", "192.168.1.0", "255.255.255.0", &[1]);

    let outgoing = router
        .handle_frame(addr("172.16.0.2"), &dump_frame("172.16.0.2"))
        .unwrap();
    match &outgoing[..] {
        [Outgoing::Message(to, Envelope { src, dst, payload })] => {
            assert_eq!(*to, addr("172.16.0.2"));
            assert_eq!(src, "172.16.0.1");
            assert_eq!(dst, "172.16.0.2");
            match payload {
                Payload::Table(entries) => {
                    assert_eq!(entries.len(), 1);
                    assert_eq!(entries[0].network, "192.168.0.0");
                    assert_eq!(entries[0].netmask, "255.255.254.0");
                    assert_eq!(entries[0].peer, "192.168.0.2");
                }
                _ => panic!(),
            }
        }
        _ => panic!(),
    }
}

#[test]
fn revoke_withdraws_and_fans_out() {
    let mut router = router(&["10.0.1.2-cust", "10.0.2.2-peer", "10.0.3.2-cust"]);
    learn(&mut router, "10.0.1.2", "172.16.0.0", "255.255.0.0", &[12]);
    learn(&mut router, "10.0.1.2", "172.17.0.0", "255.255.0.0", &[12]);

    let outgoing = router
        .handle_frame(
            addr("10.0.1.2"),
            &revoke_frame("10.0.1.2", &[("172.16.0.0", "255.255.0.0")]),
        )
        .unwrap();

    // Withdrawal is complete for the listed pair, the rest survives
    let remaining = router.rib().routes_of(addr("10.0.1.2"));
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].network, "172.17.0.0");

    // Revocation from a customer reaches every other neighbor, verbatim
    let targets: Vec<Ipv4Addr> = outgoing.iter().map(Outgoing::neighbor).collect();
    assert_eq!(targets, vec![addr("10.0.2.2"), addr("10.0.3.2")]);
    match &outgoing[0] {
        Outgoing::Message(_, envelope) => match &envelope.payload {
            Payload::Revoke(withdrawn) => {
                assert_eq!(withdrawn.len(), 1);
                assert_eq!(withdrawn[0].network, "172.16.0.0");
                assert_eq!(withdrawn[0].netmask, "255.255.0.0");
            }
            _ => panic!(),
        },
        _ => panic!(),
    }

    // Traffic to the withdrawn prefix now bounces
    let outgoing = router
        .handle_frame(addr("10.0.3.2"), &data_frame("10.0.3.9", "172.16.5.5"))
        .unwrap();
    match &outgoing[..] {
        [Outgoing::Message(_, envelope)] => assert_eq!(envelope.payload, Payload::no_route()),
        _ => panic!(),
    }
}

#[test]
fn update_and_revocation_logs_accumulate() {
    let mut router = router(&["10.0.1.2-cust"]);
    learn(&mut router, "10.0.1.2", "172.16.0.0", "255.255.0.0", &[12]);
    router
        .handle_frame(
            addr("10.0.1.2"),
            &revoke_frame("10.0.1.2", &[("172.16.0.0", "255.255.0.0")]),
        )
        .unwrap();

    assert_eq!(router.rib().update_log().len(), 1);
    assert_eq!(router.rib().revocation_log().len(), 1);
    // The log keeps the announcement verbatim even after revocation
    assert_eq!(router.rib().update_log()[0].update.network, "172.16.0.0");
    assert!(router.rib().is_empty());
}
