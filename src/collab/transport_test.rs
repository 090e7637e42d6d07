use super::*;

fn envelope(from: PeerId, to: Option<PeerId>) -> Envelope {
    Envelope { from, to, message: SyncMessage::SyncRequest }
}

#[test]
fn broadcast_skips_sender() {
    let relay = LocalRelay::new();
    let mut a = relay.join("room", 1).unwrap();
    let mut b = relay.join("room", 2).unwrap();
    relay.send("room", envelope(1, None)).unwrap();
    assert!(a.try_recv().is_err());
    assert_eq!(b.try_recv().unwrap(), envelope(1, None));
}

#[test]
fn direct_message_reaches_only_target() {
    let relay = LocalRelay::new();
    let mut a = relay.join("room", 1).unwrap();
    let mut b = relay.join("room", 2).unwrap();
    let mut c = relay.join("room", 3).unwrap();
    relay.send("room", envelope(1, Some(3))).unwrap();
    assert!(a.try_recv().is_err());
    assert!(b.try_recv().is_err());
    assert!(c.try_recv().is_ok());
}

#[test]
fn rooms_are_isolated() {
    let relay = LocalRelay::new();
    let _a = relay.join("one", 1).unwrap();
    let mut b = relay.join("two", 2).unwrap();
    relay.send("one", envelope(1, None)).unwrap();
    assert!(b.try_recv().is_err());
}

#[test]
fn leave_removes_peer_and_empty_room() {
    let relay = LocalRelay::new();
    let _a = relay.join("room", 1).unwrap();
    assert_eq!(relay.peer_count("room"), 1);
    relay.leave("room", 1);
    relay.leave("room", 1);
    assert_eq!(relay.peer_count("room"), 0);
    assert!(matches!(relay.send("room", envelope(1, None)), Err(CollabError::Closed(_))));
}

#[test]
fn offline_relay_refuses_join_and_send() {
    let relay = LocalRelay::new();
    let _a = relay.join("room", 1).unwrap();
    relay.set_online(false);
    assert!(matches!(relay.join("room", 2), Err(CollabError::Unavailable(_))));
    assert!(matches!(relay.send("room", envelope(1, None)), Err(CollabError::Unavailable(_))));
}

#[test]
fn closed_receiver_is_dropped_from_room() {
    let relay = LocalRelay::new();
    let _a = relay.join("room", 1).unwrap();
    let b = relay.join("room", 2).unwrap();
    drop(b);
    relay.send("room", envelope(1, None)).unwrap();
    assert_eq!(relay.peer_count("room"), 1);
}

#[test]
fn envelope_wire_format_is_tagged() {
    let json = serde_json::to_value(envelope(7, None)).unwrap();
    assert_eq!(json["message"]["kind"], "sync_request");
    assert_eq!(json["from"], 7);
}
