//! Property-based invariant tests for the event-emission contract.
//!
//! Random operation sequences run against each container and a plain std
//! model side by side. After every call:
//!
//! 1. A call that changes state emits one item event per affected element
//!    and exactly one collection event.
//! 2. A call that changes nothing emits zero events.
//! 3. The container matches the model.
//! 4. `version()` equals the number of state-changing calls so far.
//!
//! Plus the codec round-trip law for all three containers.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ftui_observable::{
    ObservableMap, ObservableSequence, ObservableSet, SnapshotCodec, Subscription,
};
use proptest::prelude::*;

// ── Counters ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counts {
    items: Rc<Cell<usize>>,
    collections: Rc<Cell<usize>>,
}

impl Counts {
    fn take(&self) -> (usize, usize) {
        (self.items.replace(0), self.collections.replace(0))
    }
}

// ── Sequence ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SeqOp {
    Add(u8),
    AddRange(Vec<u8>),
    Insert(usize, u8),
    Remove(u8),
    RemoveAt(usize),
    Set(usize, u8),
    Clear,
}

fn seq_op() -> impl Strategy<Value = SeqOp> {
    prop_oneof![
        (0u8..6).prop_map(SeqOp::Add),
        proptest::collection::vec(0u8..6, 0..4).prop_map(SeqOp::AddRange),
        (0usize..10, 0u8..6).prop_map(|(i, v)| SeqOp::Insert(i, v)),
        (0u8..6).prop_map(SeqOp::Remove),
        (0usize..10).prop_map(SeqOp::RemoveAt),
        (0usize..10, 0u8..6).prop_map(|(i, v)| SeqOp::Set(i, v)),
        Just(SeqOp::Clear),
    ]
}

/// Apply `op` to the model; return the number of affected elements.
fn apply_seq_model(model: &mut Vec<u8>, op: &SeqOp) -> usize {
    match op {
        SeqOp::Add(v) => {
            model.push(*v);
            1
        }
        SeqOp::AddRange(vs) => {
            model.extend(vs);
            vs.len()
        }
        SeqOp::Insert(i, v) => {
            if *i > model.len() {
                return 0;
            }
            model.insert(*i, *v);
            1
        }
        SeqOp::Remove(v) => match model.iter().position(|x| x == v) {
            Some(i) => {
                model.remove(i);
                1
            }
            None => 0,
        },
        SeqOp::RemoveAt(i) => {
            if *i >= model.len() {
                return 0;
            }
            model.remove(*i);
            1
        }
        SeqOp::Set(i, v) => {
            if *i >= model.len() || model[*i] == *v {
                return 0;
            }
            model[*i] = *v;
            1
        }
        SeqOp::Clear => std::mem::take(model).len(),
    }
}

fn apply_seq(seq: &ObservableSequence<u8>, op: &SeqOp) {
    match op {
        SeqOp::Add(v) => seq.add(*v),
        SeqOp::AddRange(vs) => seq.add_range(vs.iter().copied()),
        SeqOp::Insert(i, v) => {
            let _ = seq.insert(*i, *v);
        }
        SeqOp::Remove(v) => {
            seq.remove(v);
        }
        SeqOp::RemoveAt(i) => {
            let _ = seq.remove_at(*i);
        }
        SeqOp::Set(i, v) => {
            let _ = seq.set(*i, *v);
        }
        SeqOp::Clear => seq.clear(),
    }
}

fn watch_seq(seq: &ObservableSequence<u8>, counts: &Counts) -> Vec<Subscription> {
    let items = Rc::clone(&counts.items);
    let collections = Rc::clone(&counts.collections);
    vec![
        seq.subscribe_items(move |_| items.set(items.get() + 1)),
        seq.subscribe_collection(move |_| collections.set(collections.get() + 1)),
    ]
}

// ── Set ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SetOp {
    Add(u8),
    AddRange(Vec<u8>),
    Remove(u8),
    Clear,
}

fn set_op() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        (0u8..8).prop_map(SetOp::Add),
        proptest::collection::vec(0u8..8, 0..5).prop_map(SetOp::AddRange),
        (0u8..8).prop_map(SetOp::Remove),
        Just(SetOp::Clear),
    ]
}

fn apply_set_model(model: &mut HashSet<u8>, op: &SetOp) -> usize {
    match op {
        SetOp::Add(v) => usize::from(model.insert(*v)),
        SetOp::AddRange(vs) => vs.iter().filter(|v| model.insert(**v)).count(),
        SetOp::Remove(v) => usize::from(model.remove(v)),
        SetOp::Clear => std::mem::take(model).len(),
    }
}

fn apply_set(set: &ObservableSet<u8>, op: &SetOp) {
    match op {
        SetOp::Add(v) => {
            set.add(*v);
        }
        SetOp::AddRange(vs) => {
            set.add_range(vs.iter().copied());
        }
        SetOp::Remove(v) => {
            set.remove(v);
        }
        SetOp::Clear => set.clear(),
    }
}

// ── Map ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Add(u8, u16),
    Set(u8, u16),
    Remove(u8),
    Clear,
}

fn map_op() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        (0u8..8, any::<u16>()).prop_map(|(k, v)| MapOp::Add(k, v)),
        (0u8..8, any::<u16>()).prop_map(|(k, v)| MapOp::Set(k, v)),
        (0u8..8).prop_map(MapOp::Remove),
        Just(MapOp::Clear),
    ]
}

fn apply_map_model(model: &mut HashMap<u8, u16>, op: &MapOp) -> usize {
    match op {
        MapOp::Add(k, v) => {
            if model.contains_key(k) {
                return 0;
            }
            model.insert(*k, *v);
            1
        }
        MapOp::Set(k, v) => {
            model.insert(*k, *v);
            1
        }
        MapOp::Remove(k) => usize::from(model.remove(k).is_some()),
        MapOp::Clear => std::mem::take(model).len(),
    }
}

fn apply_map(map: &ObservableMap<u8, u16>, op: &MapOp) {
    match op {
        MapOp::Add(k, v) => {
            let _ = map.add(*k, *v);
        }
        MapOp::Set(k, v) => {
            map.set(*k, *v);
        }
        MapOp::Remove(k) => {
            map.remove(k);
        }
        MapOp::Clear => map.clear(),
    }
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn sequence_emits_per_contract(ops in proptest::collection::vec(seq_op(), 1..40)) {
        let seq = ObservableSequence::new();
        let counts = Counts::default();
        let _subs = watch_seq(&seq, &counts);
        let mut model = Vec::new();
        let mut changes = 0u64;

        for op in &ops {
            let affected = apply_seq_model(&mut model, op);
            apply_seq(&seq, op);
            let (items, collections) = counts.take();
            prop_assert_eq!(items, affected, "op {:?}", op);
            prop_assert_eq!(collections, usize::from(affected > 0), "op {:?}", op);
            changes += u64::from(affected > 0);
            prop_assert_eq!(seq.to_vec(), model.clone());
            prop_assert_eq!(seq.version(), changes);
        }
    }

    #[test]
    fn set_emits_per_contract(ops in proptest::collection::vec(set_op(), 1..40)) {
        let set = ObservableSet::new();
        let counts = Counts::default();
        let items_c = Rc::clone(&counts.items);
        let coll_c = Rc::clone(&counts.collections);
        let _i = set.subscribe_items(move |_| items_c.set(items_c.get() + 1));
        let _c = set.subscribe_collection(move |_| coll_c.set(coll_c.get() + 1));
        let mut model = HashSet::new();
        let mut changes = 0u64;

        for op in &ops {
            let affected = apply_set_model(&mut model, op);
            apply_set(&set, op);
            let (items, collections) = counts.take();
            prop_assert_eq!(items, affected, "op {:?}", op);
            prop_assert_eq!(collections, usize::from(affected > 0), "op {:?}", op);
            changes += u64::from(affected > 0);
            prop_assert_eq!(set.with(Clone::clone), model.clone());
            prop_assert_eq!(set.version(), changes);
        }
    }

    #[test]
    fn map_emits_per_contract(ops in proptest::collection::vec(map_op(), 1..40)) {
        let map = ObservableMap::new();
        let counts = Counts::default();
        let items_c = Rc::clone(&counts.items);
        let coll_c = Rc::clone(&counts.collections);
        let _i = map.subscribe_items(move |_| items_c.set(items_c.get() + 1));
        let _c = map.subscribe_collection(move |_| coll_c.set(coll_c.get() + 1));
        let mut model = HashMap::new();
        let mut changes = 0u64;

        for op in &ops {
            let affected = apply_map_model(&mut model, op);
            apply_map(&map, op);
            let (items, collections) = counts.take();
            prop_assert_eq!(items, affected, "op {:?}", op);
            prop_assert_eq!(collections, usize::from(affected > 0), "op {:?}", op);
            changes += u64::from(affected > 0);
            prop_assert_eq!(map.with(Clone::clone), model.clone());
            prop_assert_eq!(map.version(), changes);
        }
    }

    #[test]
    fn map_round_trip(pairs in proptest::collection::vec((any::<u8>(), any::<u32>()), 0..50)) {
        let map: ObservableMap<u8, u32> = pairs.into_iter().collect();
        let decoded = ObservableMap::decode(map.encode()).unwrap();
        prop_assert_eq!(decoded.with(Clone::clone), map.with(Clone::clone));
    }

    #[test]
    fn sequence_round_trip(items in proptest::collection::vec(any::<i32>(), 0..50)) {
        let seq = ObservableSequence::from_vec(items.clone());
        let decoded = ObservableSequence::decode(seq.encode()).unwrap();
        prop_assert_eq!(decoded.to_vec(), items);
    }

    #[test]
    fn set_round_trip(items in proptest::collection::hash_set(any::<u16>(), 0..50)) {
        let set = ObservableSet::from_set(items.clone());
        let decoded = ObservableSet::decode(set.encode()).unwrap();
        prop_assert_eq!(decoded.with(Clone::clone), items);
    }
}
