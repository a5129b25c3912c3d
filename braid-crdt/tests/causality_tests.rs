use braid_crdt::{CausalOrder, CausalityTracker, CausalityVector, CrdtError};
use braid_types::SiteId;

#[test]
fn new_vector_is_empty() {
    let vector = CausalityVector::new();
    assert!(vector.is_empty());
    assert_eq!(vector.len(), 0);
    assert!(CausalityVector::default().is_empty());
}

#[test]
fn get_unknown_site_returns_zero() {
    let vector = CausalityVector::new();
    assert_eq!(vector.get(&SiteId::new()), 0);
}

#[test]
fn increment_increases_counter() {
    let site = SiteId::new();
    let mut vector = CausalityVector::new();
    assert_eq!(vector.increment(site), 1);
    assert_eq!(vector.increment(site), 2);
    assert_eq!(vector.get(&site), 2);
    assert_eq!(vector.len(), 1);
}

#[test]
fn update_lower_value_is_noop() {
    let site = SiteId::new();
    let mut vector = CausalityVector::new();
    vector.update(site, 10);
    vector.update(site, 3);
    assert_eq!(vector.get(&site), 10);
}

#[test]
fn covers_is_inclusive() {
    let site = SiteId::new();
    let vector: CausalityVector = [(site, 4)].into_iter().collect();
    assert!(vector.covers(&site, 3));
    assert!(vector.covers(&site, 4));
    assert!(!vector.covers(&site, 5));
    assert!(!vector.covers(&SiteId::new(), 1));
}

// ── Compare ──────────────────────────────────────────────────────

#[test]
fn compare_empty_vectors_are_equal() {
    assert_eq!(
        CausalityVector::new().compare(&CausalityVector::new()),
        CausalOrder::Equal
    );
}

#[test]
fn compare_before_after() {
    let site = SiteId::new();
    let a: CausalityVector = [(site, 1)].into_iter().collect();
    let b: CausalityVector = [(site, 2)].into_iter().collect();

    assert_eq!(a.compare(&b), CausalOrder::Before);
    assert_eq!(b.compare(&a), CausalOrder::After);
    assert_ne!(a, b);
}

#[test]
fn compare_concurrent() {
    let a: CausalityVector = [(SiteId::new(), 1)].into_iter().collect();
    let b: CausalityVector = [(SiteId::new(), 1)].into_iter().collect();

    assert_eq!(a.compare(&b), CausalOrder::Concurrent);
    assert_eq!(b.compare(&a), CausalOrder::Concurrent);
}

#[test]
fn zero_entry_equals_missing_entry() {
    let site = SiteId::new();
    let mut a = CausalityVector::new();
    a.update(site, 0);
    assert_eq!(a, CausalityVector::new());
}

// ── Merge / meet ─────────────────────────────────────────────────

#[test]
fn merge_takes_maximum() {
    let s1 = SiteId::new();
    let s2 = SiteId::new();
    let mut a: CausalityVector = [(s1, 2)].into_iter().collect();
    let b: CausalityVector = [(s1, 1), (s2, 3)].into_iter().collect();

    a.merge(&b);
    assert_eq!(a.get(&s1), 2);
    assert_eq!(a.get(&s2), 3);
}

#[test]
fn merge_is_commutative_and_idempotent() {
    let a: CausalityVector = [(SiteId::new(), 2)].into_iter().collect();
    let b: CausalityVector = [(SiteId::new(), 5)].into_iter().collect();

    let mut ab = a.clone();
    ab.merge(&b);
    let mut ba = b.clone();
    ba.merge(&a);
    assert_eq!(ab, ba);

    let mut aa = a.clone();
    aa.merge(&a);
    assert_eq!(aa, a);
}

#[test]
fn meet_takes_minimum_and_drops_missing_sites() {
    let s1 = SiteId::new();
    let s2 = SiteId::new();
    let s3 = SiteId::new();
    let a: CausalityVector = [(s1, 5), (s2, 2), (s3, 7)].into_iter().collect();
    let b: CausalityVector = [(s1, 3), (s2, 4)].into_iter().collect();

    let m = a.met(&b);
    assert_eq!(m.get(&s1), 3);
    assert_eq!(m.get(&s2), 2);
    assert_eq!(m.get(&s3), 0);
    assert_eq!(m.len(), 2);
    assert_eq!(m, b.met(&a));
}

#[test]
fn meet_with_empty_is_empty() {
    let a: CausalityVector = [(SiteId::new(), 5)].into_iter().collect();
    assert!(a.met(&CausalityVector::new()).is_empty());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serialization_roundtrip() {
    let vector: CausalityVector = [(SiteId::new(), 2), (SiteId::new(), 1)]
        .into_iter()
        .collect();

    let json = serde_json::to_string(&vector).unwrap();
    let parsed: CausalityVector = serde_json::from_str(&json).unwrap();
    assert_eq!(vector, parsed);
}

// ── Tracker ──────────────────────────────────────────────────────

#[test]
fn tracker_records_in_order() {
    let site = SiteId::new();
    let mut tracker = CausalityTracker::new();

    assert!(tracker.is_ready(&site, 1));
    assert!(!tracker.has_applied(&site, 1));
    tracker.record_applied(site, 1).unwrap();
    assert!(tracker.has_applied(&site, 1));
    assert!(tracker.is_ready(&site, 2));
    assert!(!tracker.is_ready(&site, 3));
}

#[test]
fn tracker_rejects_gap() {
    let site = SiteId::new();
    let mut tracker = CausalityTracker::new();

    let err = tracker.record_applied(site, 3).unwrap_err();
    assert_eq!(
        err,
        CrdtError::CausalGap {
            site,
            expected: 1,
            got: 3
        }
    );
    assert_eq!(tracker.vector().get(&site), 0);
}

#[test]
fn tracker_rejects_replay() {
    let site = SiteId::new();
    let mut tracker = CausalityTracker::new();
    tracker.record_applied(site, 1).unwrap();
    assert!(tracker.record_applied(site, 1).is_err());
}

#[test]
fn tracker_origins_are_independent() {
    let a = SiteId::new();
    let b = SiteId::new();
    let mut tracker = CausalityTracker::new();
    tracker.record_applied(b, 1).unwrap();
    tracker.record_applied(a, 1).unwrap();
    tracker.record_applied(b, 2).unwrap();
    assert_eq!(tracker.vector().get(&a), 1);
    assert_eq!(tracker.vector().get(&b), 2);
}

#[test]
fn tracker_resumes_from_vector() {
    let site = SiteId::new();
    let vector: CausalityVector = [(site, 9)].into_iter().collect();
    let tracker = CausalityTracker::from_vector(vector);
    assert!(tracker.has_applied(&site, 9));
    assert!(tracker.is_ready(&site, 10));
}
