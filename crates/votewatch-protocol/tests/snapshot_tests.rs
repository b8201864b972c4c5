use serde_json::json;
use votewatch_protocol::{MembershipSnapshot, PollSnapshot, ProtocolError, VoteReceipt, VoteRequest};

#[test]
fn test_poll_snapshot_decodes_counts() {
    let raw = json!({"poll_id": "p1", "counts": {"b": 2, "a": 5}});
    let snap = PollSnapshot::from_json("  p1 ", raw.clone()).unwrap();
    assert_eq!(snap.poll_id, "p1");
    assert_eq!(snap.counts.get("a"), Some(&5));
    assert_eq!(snap.counts.get("b"), Some(&2));
    assert_eq!(snap.total_votes(), 7);
    assert_eq!(snap.raw, raw, "raw payload must be kept verbatim");
}

#[test]
fn test_poll_snapshot_rejects_overflowing_total() {
    let err = PollSnapshot::from_json("p1", json!({"counts": {"a": u64::MAX, "b": 1}})).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPoll(_)));
    assert!(err.to_string().contains("overflows"));

    let snap = PollSnapshot::from_json("p1", json!({"counts": {"a": u64::MAX, "b": 0}})).unwrap();
    assert_eq!(snap.total_votes(), u64::MAX);
}

#[test]
fn test_vote_request_body() {
    let body = VoteRequest::new(" p1 ", " yes ").to_json().unwrap();
    assert_eq!(body, json!({"poll_id": "p1", "option": "yes"}));
}

#[test]
fn test_poll_snapshot_missing_counts_is_empty() {
    let snap = PollSnapshot::from_json("p1", json!({"poll_id": "p1"})).unwrap();
    assert!(snap.counts.is_empty());
}

#[test]
fn test_poll_snapshot_rejects_bad_counts() {
    let err = PollSnapshot::from_json("p1", json!({"counts": [1, 2]})).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPoll(_)));

    let err = PollSnapshot::from_json("p1", json!({"counts": {"a": -1}})).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPoll(_)));

    let err = PollSnapshot::from_json("p1", json!({"counts": {"a": "3"}})).unwrap_err();
    assert!(err.to_string().contains("'a'"));
}

#[test]
fn test_membership_snapshot_preserves_order() {
    let raw = json!({
        "node": "node1",
        "peers": [
            {"peer": "10.0.0.2:7000", "state": "Suspect"},
            {"peer": "10.0.0.1:7000", "state": "ALIVE", "last_seen_seconds_ago": 0.4},
        ]
    });
    let snap = MembershipSnapshot::from_json(raw).unwrap();
    assert_eq!(snap.node.as_deref(), Some("node1"));
    let peers: Vec<&str> = snap.peers.iter().map(|p| p.peer.as_str()).collect();
    assert_eq!(peers, vec!["10.0.0.2:7000", "10.0.0.1:7000"]);
    assert_eq!(snap.peers[0].last_seen_secs, None);
    assert_eq!(snap.peers[1].last_seen_secs, Some(0.4));
}

#[test]
fn test_membership_snapshot_missing_or_null_state() {
    let raw = json!({"peers": [{"peer": "a"}, {"peer": "b", "state": null}]});
    let snap = MembershipSnapshot::from_json(raw).unwrap();
    assert_eq!(snap.peers[0].state, "");
    assert_eq!(snap.peers[1].state, "");
}

#[test]
fn test_membership_snapshot_rejects_bad_shape() {
    assert!(matches!(
        MembershipSnapshot::from_json(json!({"peers": {"peer": "a"}})),
        Err(ProtocolError::MalformedStatus(_))
    ));
    assert!(matches!(
        MembershipSnapshot::from_json(json!({"peers": [{"state": "ALIVE"}]})),
        Err(ProtocolError::MalformedStatus(_))
    ));
    assert!(MembershipSnapshot::from_json(json!({})).unwrap().peers.is_empty());
}

#[test]
fn test_vote_request_trims_only() {
    let req = VoteRequest::new("  poll1\t", "  ");
    assert_eq!(req.poll_id, "poll1");
    assert_eq!(req.option, "", "empty option is passed through");
    assert_eq!(
        serde_json::to_value(&req).unwrap(),
        json!({"poll_id": "poll1", "option": ""})
    );
}

#[test]
fn test_vote_receipt_is_lenient() {
    let receipt = VoteReceipt::from_json(&json!({"ok": true, "node": "node2"}));
    assert_eq!(receipt.ok, Some(true));
    assert_eq!(receipt.node.as_deref(), Some("node2"));
    assert_eq!(VoteReceipt::from_json(&json!("done")), VoteReceipt::default());
}
