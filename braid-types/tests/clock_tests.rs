use braid_types::{compare_ids, compare_stamped, ElementId, ReplicaState, SiteId};
use proptest::prelude::*;
use std::cmp::Ordering;

fn site(n: u128) -> SiteId {
    SiteId::from_uuid(uuid::Uuid::from_u128(n))
}

#[test]
fn next_id_starts_at_one_and_increments() {
    let s = SiteId::new();
    let mut replica = ReplicaState::new(s);
    assert_eq!(replica.counter(), 0);
    assert_eq!(replica.next_id(), ElementId::new(s, 1));
    assert_eq!(replica.next_id(), ElementId::new(s, 2));
    assert_eq!(replica.counter(), 2);
    assert_eq!(replica.site(), s);
}

#[test]
fn next_id_never_repeats() {
    let mut replica = ReplicaState::new(SiteId::new());
    let ids: std::collections::HashSet<_> = (0..1000).map(|_| replica.next_id()).collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn observe_only_moves_forward() {
    let s = SiteId::new();
    let mut replica = ReplicaState::resume(s, 10);
    replica.observe(4);
    assert_eq!(replica.counter(), 10);
    replica.observe(15);
    assert_eq!(replica.next_id(), ElementId::new(s, 16));
}

#[test]
fn compare_ids_counter_first() {
    let a = ElementId::new(site(9), 1);
    let b = ElementId::new(site(1), 2);
    assert_eq!(compare_ids(&a, &b), Ordering::Less);
}

#[test]
fn compare_ids_site_breaks_ties() {
    let a = ElementId::new(site(1), 5);
    let b = ElementId::new(site(2), 5);
    assert_eq!(compare_ids(&a, &b), Ordering::Less);
    assert_eq!(compare_ids(&b, &a), Ordering::Greater);
    assert_eq!(compare_ids(&a, &a), Ordering::Equal);
}

#[test]
fn root_sorts_before_everything() {
    let id = ElementId::new(SiteId::new(), 1);
    assert!(ElementId::ROOT < id);
}

proptest! {
    #[test]
    fn compare_ids_is_antisymmetric(
        s1 in 1u128..50,
        c1 in 1u64..50,
        s2 in 1u128..50,
        c2 in 1u64..50,
    ) {
        let a = ElementId::new(site(s1), c1);
        let b = ElementId::new(site(s2), c2);
        prop_assert_eq!(compare_ids(&a, &b), compare_ids(&b, &a).reverse());
        prop_assert_eq!(compare_ids(&a, &b) == Ordering::Equal, a == b);
    }
}

#[test]
fn stamps_move_past_everything_observed() {
    let mut replica = ReplicaState::new(SiteId::new());
    assert_eq!(replica.next_stamp(), 1);
    replica.observe_stamp(40);
    replica.observe_stamp(7);
    assert_eq!(replica.lamport(), 40);
    assert_eq!(replica.next_stamp(), 41);
    // The dense counter is untouched by stamps.
    assert_eq!(replica.counter(), 0);
}

#[test]
fn compare_stamped_puts_stamp_before_id() {
    let low_counter = ElementId::new(site(1), 1);
    let high_counter = ElementId::new(site(2), 9);
    assert_eq!(
        compare_stamped((5, &low_counter), (3, &high_counter)),
        Ordering::Greater
    );
    assert_eq!(
        compare_stamped((4, &low_counter), (4, &high_counter)),
        Ordering::Less
    );
}
