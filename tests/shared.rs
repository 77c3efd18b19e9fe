// Shared / Unique integration suite.
//
// Core invariants exercised:
// - Count: strong_count equals the number of live handles.
// - Destruction: the payload's drop runs exactly once, at the drop that
//   brings the count to zero, and the block goes back to its allocator.
// - Recursion: destroying a payload that owns handles releases those
//   handles in turn (nested boxes, arrays of handles).
// - Failure: OutOfMemory surfaces from the try_ constructors only.
use rc_heap::{AllocError, DynArray, Shared, TrackingAllocator, Unique};
use std::cell::Cell;
use std::rc::Rc;

struct DropCount(Rc<Cell<usize>>);

impl Drop for DropCount {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

// Test: clone then drop is neutral.
// Verifies: the count returns to its previous value.
#[test]
fn clone_then_drop_leaves_count_unchanged() {
    let a = Shared::new(1);
    let b = a.clone();
    let before = Shared::strong_count(&a);
    let c = b.clone();
    drop(c);
    assert_eq!(Shared::strong_count(&a), before);
}

// Test: k clones and k+1 drops.
// Verifies: the destructor runs exactly once, and not before the last drop.
#[test]
fn destructor_runs_once_after_last_drop() {
    for k in [0usize, 1, 5, 64] {
        let drops = Rc::new(Cell::new(0));
        let first = Shared::new(DropCount(drops.clone()));
        let mut handles: Vec<_> = (0..k).map(|_| first.clone()).collect();
        assert_eq!(Shared::strong_count(&first), k + 1);

        drop(first);
        while let Some(h) = handles.pop() {
            assert_eq!(drops.get(), 0, "destroyed before the last drop (k={k})");
            drop(h);
        }
        assert_eq!(drops.get(), 1, "k={k}");
    }
}

// Test: recursive destruction through nested boxes and arrays.
// Assumes: a payload's drop glue drops the handles it owns.
// Verifies: one drop at the root cascades to every leaf exactly once and
// leaves no block allocated.
#[test]
fn nested_destruction_cascades() {
    let drops = Rc::new(Cell::new(0));
    let t = TrackingAllocator::new();

    let leaves: Vec<Shared<DropCount, _>> = (0..4)
        .map(|_| Shared::new_in(DropCount(drops.clone()), &t))
        .collect();
    let mut arr = DynArray::new_in(&t);
    for l in &leaves {
        arr.push(l.clone());
    }
    let root = Shared::new_in(arr, &t);
    let outer = Shared::new_in(root.clone(), &t);
    drop(leaves);
    drop(root);
    assert_eq!(drops.get(), 0);
    assert!(t.live_blocks() > 0);

    drop(outer);
    assert_eq!(drops.get(), 4);
    assert_eq!(t.live_blocks(), 0);
}

// Test: shared payload visible through every alias.
// Verifies: interior mutability works through any handle and all handles
// observe the same payload.
#[test]
fn aliases_observe_the_same_payload() {
    let a = Shared::new(Cell::new(1));
    let b = a.clone();
    b.set(2);
    assert_eq!(Shared::get(&a).get(), 2);
    assert_eq!(Shared::as_ptr(&a), Shared::as_ptr(&b));
}

#[test]
fn try_new_surfaces_out_of_memory() {
    let t = TrackingAllocator::with_limit(8);
    let err = Shared::try_new_in([0u64; 4], &t).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(t.stats().allocations, 0);
    assert!(Shared::try_new(5u8).is_ok());
}

#[test]
fn into_inner_only_for_last_handle() {
    let drops = Rc::new(Cell::new(0));
    let a = Shared::new(DropCount(drops.clone()));
    let b = a.clone();
    assert!(Shared::into_inner(a).is_none());
    assert_eq!(drops.get(), 0);
    let v = Shared::into_inner(b).expect("last handle");
    assert_eq!(drops.get(), 0);
    drop(v);
    assert_eq!(drops.get(), 1);
}

// Test: unique handle lifecycle.
// Verifies: exclusive mutation, release on drop, and conversion to a
// shared handle without losing or duplicating the payload.
#[test]
fn unique_handle_lifecycle() {
    let drops = Rc::new(Cell::new(0));
    let t = TrackingAllocator::new();
    let mut u = Unique::new_in((0u32, DropCount(drops.clone())), &t);
    u.0 += 7;
    let s = u.into_shared();
    let s2 = s.clone();
    assert_eq!(s2.0, 7);
    assert_eq!(drops.get(), 0);
    drop(s);
    drop(s2);
    assert_eq!(drops.get(), 1);
    assert_eq!(t.live_blocks(), 0);
}
