use braid_crdt::{compute_safe_horizon, CausalityVector, Operation, Sequence, SessionClock};
use braid_types::{ElementId, SiteId};
use std::time::{Duration, Instant};

fn site(n: u8) -> SiteId {
    SiteId::from_uuid(uuid::Uuid::from_bytes([
        n, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]))
}

fn vector(entries: &[(SiteId, u64)]) -> CausalityVector {
    entries.iter().copied().collect()
}

const GRACE: Duration = Duration::from_secs(300);

// ── Safe horizon ─────────────────────────────────────────────────

#[test]
fn horizon_of_no_sessions_is_empty() {
    let sessions: Vec<SessionClock> = Vec::new();
    assert!(compute_safe_horizon(&sessions, Instant::now(), GRACE).is_empty());
}

#[test]
fn horizon_is_elementwise_minimum() {
    let sessions = vec![
        SessionClock::attached(vector(&[(site(1), 5), (site(2), 3)])),
        SessionClock::attached(vector(&[(site(1), 2), (site(2), 9), (site(3), 4)])),
    ];
    let horizon = compute_safe_horizon(&sessions, Instant::now(), GRACE);
    assert_eq!(horizon.get(&site(1)), 2);
    assert_eq!(horizon.get(&site(2)), 3);
    assert_eq!(horizon.get(&site(3)), 0);
}

#[test]
fn recently_disconnected_session_still_counts() {
    let now = Instant::now();
    let mut lagging = SessionClock::attached(vector(&[(site(1), 1)]));
    lagging.disconnected_at = Some(now);
    let sessions = vec![SessionClock::attached(vector(&[(site(1), 8)])), lagging];

    let later = now + Duration::from_secs(60);
    assert_eq!(compute_safe_horizon(&sessions, later, GRACE).get(&site(1)), 1);
}

#[test]
fn session_beyond_grace_is_excluded() {
    let now = Instant::now();
    let mut gone = SessionClock::attached(vector(&[(site(1), 1)]));
    gone.disconnected_at = Some(now);
    let sessions = vec![SessionClock::attached(vector(&[(site(1), 8)])), gone];

    let later = now + GRACE + Duration::from_secs(1);
    assert_eq!(compute_safe_horizon(&sessions, later, GRACE).get(&site(1)), 8);
}

#[test]
fn only_expired_sessions_give_empty_horizon() {
    let now = Instant::now();
    let mut gone = SessionClock::attached(vector(&[(site(1), 4)]));
    gone.disconnected_at = Some(now);
    let later = now + GRACE * 2;
    assert!(compute_safe_horizon([&gone], later, GRACE).is_empty());
}

// ── Collection ───────────────────────────────────────────────────

#[test]
fn collect_never_removes_live_elements() {
    let mut seq = Sequence::new(site(1));
    seq.insert_str(ElementId::ROOT, "live").unwrap();
    let horizon = seq.vector().clone();
    assert_eq!(seq.collect(&horizon), 0);
    assert_eq!(seq.as_string(), "live");
    assert_eq!(seq.element_count(), 4);
}

#[test]
fn collect_with_empty_horizon_is_noop() {
    let mut seq = Sequence::new(site(1));
    let ops = seq.insert_str(ElementId::ROOT, "ab").unwrap();
    seq.local_delete(ops[0].id);
    assert_eq!(seq.collect(&CausalityVector::new()), 0);
    assert_eq!(seq.tombstone_count(), 1);
}

#[test]
fn collect_waits_until_delete_is_observed() {
    let mut seq = Sequence::new(site(1));
    let x = seq.local_insert('x', ElementId::ROOT).unwrap();
    seq.local_delete(x.id).unwrap();

    // The insert is covered but the delete (counter 2) is not.
    assert_eq!(seq.collect(&vector(&[(site(1), 1)])), 0);
    assert!(seq.contains_element(&x.id));

    assert_eq!(seq.collect(&vector(&[(site(1), 2)])), 1);
    assert!(!seq.contains_element(&x.id));
}

#[test]
fn interior_tombstones_are_collected() {
    let mut seq = Sequence::new(site(1));
    let ops = seq.insert_str(ElementId::ROOT, "hello").unwrap();
    for op in &ops[..4] {
        seq.local_delete(op.id).unwrap();
    }

    let horizon = seq.vector().clone();
    assert_eq!(seq.collect(&horizon), 4);
    assert_eq!(seq.as_string(), "o");
    assert_eq!(seq.element_count(), 1);
    // 'o' still descends from the collected run.
    assert_eq!(seq.forward_count(), 4);

    // Once the last child goes, the forwarding records go with it.
    seq.local_delete(ops[4].id).unwrap();
    let horizon = seq.vector().clone();
    assert_eq!(seq.collect(&horizon), 1);
    assert_eq!(seq.element_count(), 0);
    assert_eq!(seq.forward_count(), 0);
}

#[test]
fn late_insert_is_placed_after_the_collected_subtree() {
    let mut a = Sequence::new(site(2));
    let ops = a.insert_str(ElementId::ROOT, "abc").unwrap();
    a.local_delete(ops[0].id).unwrap();

    // Site 1 inserts at the start without having seen anything. Same stamp
    // as 'a' and a lower site, so it sorts after the whole 'a' subtree.
    let mut b = Sequence::new(site(1));
    let x = b.local_insert('x', ElementId::ROOT).unwrap();
    assert_eq!(x.lamport, ops[0].lamport);

    let mut kept = a.clone();
    let horizon = a.vector().clone();
    assert_eq!(a.collect(&horizon), 1);
    assert!(!a.contains_element(&ops[0].id));

    a.apply_operation(x.clone().into()).unwrap();
    kept.apply_operation(x.into()).unwrap();
    assert_eq!(kept.as_string(), "bcx");
    assert_eq!(a.as_string(), "bcx");
}

#[test]
fn collect_keeps_anchor_of_buffered_insert() {
    let mut a = Sequence::new(site(1));
    let x = a.local_insert('x', ElementId::ROOT).unwrap();

    let mut b = Sequence::new(site(2));
    b.apply_operation(x.clone().into()).unwrap();
    let _first = b.local_insert('p', ElementId::ROOT).unwrap();
    let second = b.local_insert('q', x.id).unwrap();

    // 'q' waits for b's first operation, and is anchored on x.
    a.apply_operation(second.into()).unwrap();
    assert_eq!(a.pending_len(), 1);

    a.local_delete(x.id).unwrap();
    let horizon = a.vector().clone();
    assert_eq!(a.collect(&horizon), 0);
    assert!(a.contains_element(&x.id));
}

#[test]
fn collect_preserves_order_of_remaining_elements() {
    let mut seq = Sequence::new(site(1));
    let ops = seq.insert_str(ElementId::ROOT, "abcdef").unwrap();
    // Deleting the tail run leaves leaf tombstones.
    for op in &ops[3..] {
        seq.local_delete(op.id).unwrap();
    }
    let horizon = seq.vector().clone();
    assert_eq!(seq.collect(&horizon), 3);
    assert_eq!(seq.as_string(), "abc");
    assert_eq!(seq.element_ids_in_order(), vec![ops[0].id, ops[1].id, ops[2].id]);

    seq.local_insert('d', ops[2].id).unwrap();
    assert_eq!(seq.as_string(), "abcd");
}

#[test]
fn replicas_converge_after_one_side_collects() {
    let mut a = Sequence::new(site(1));
    let mut b = Sequence::new(site(2));

    let ops = a.insert_str(ElementId::ROOT, "abc").unwrap();
    for op in &ops {
        b.apply_operation(op.clone().into()).unwrap();
    }
    let del = a.local_delete(ops[2].id).unwrap();
    b.apply_operation(del.into()).unwrap();

    // Both replicas have seen everything: safe to collect on A only.
    let sessions = [
        SessionClock::attached(a.vector().clone()),
        SessionClock::attached(b.vector().clone()),
    ];
    let horizon = compute_safe_horizon(&sessions, Instant::now(), GRACE);
    assert_eq!(a.collect(&horizon), 1);

    let tail_b = b.local_insert('!', ops[1].id).unwrap();
    let tail_a = a.local_insert('?', ops[1].id).unwrap();
    a.apply_operation(Operation::from(tail_b)).unwrap();
    b.apply_operation(Operation::from(tail_a)).unwrap();

    assert_eq!(a.as_string(), b.as_string());
}
