#![cfg(test)]

// Property tests for ChainHashMap kept inside the crate so they can check
// bucket heads directly.

use crate::chain_hash_map::{ChainHashMap, Handle, InsertError};
use crate::hasher::{IdentityHasher, KeyHasher, StdHasher};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    TryInsert(usize, i32),
    InsertWith(usize, i32),
    Erase(usize),
    Remove(usize),
    Find(usize),
    Mutate(usize, i32),
    Iterate,
    // Pin the max load factor to the current load so the next insert grows.
    Grow,
}

fn arb_scenario<S>(key: S) -> impl Strategy<Value = (Vec<S::Value>, Vec<Op>)>
where
    S: Strategy,
    S::Value: Clone,
{
    proptest::collection::vec(key, 1..=12).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::TryInsert(i, v)),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::InsertWith(i, v)),
            idx.clone().prop_map(Op::Erase),
            idx.clone().prop_map(Op::Remove),
            idx.clone().prop_map(Op::Find),
            (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            Just(Op::Iterate),
            Just(Op::Grow),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// After every op:
// - bucket heads are the earliest chain entry of their bucket;
// - erased handles never resolve;
// - every model key is retrievable with its model value;
// - len/is_empty match the model.
fn run_scenario<K, H>(
    mut sut: ChainHashMap<K, i32, H>,
    pool: &[K],
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    K: Clone + Eq + Hash + Debug,
    H: KeyHasher<K>,
{
    let mut model: HashMap<K, i32> = HashMap::new();
    let mut live: HashMap<K, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    let make_calls = Cell::new(0usize);

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = pool[i].clone();
                let h = sut.insert(k.clone(), v);
                match live.get(&k) {
                    Some(&prev) => prop_assert_eq!(h, prev, "duplicate insert must name the existing entry"),
                    None => {
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                }
            }
            Op::TryInsert(i, v) => {
                let k = pool[i].clone();
                match sut.try_insert(k.clone(), v) {
                    Ok(h) => {
                        prop_assert!(!model.contains_key(&k), "try_insert must fail on duplicate");
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey(h)) => {
                        prop_assert_eq!(Some(&h), live.get(&k));
                    }
                }
            }
            Op::InsertWith(i, v) => {
                let k = pool[i].clone();
                let before = make_calls.get();
                let res = sut.insert_with(k.clone(), || {
                    make_calls.set(make_calls.get() + 1);
                    v
                });
                match res {
                    Ok(h) => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert_eq!(make_calls.get(), before + 1);
                        live.insert(k.clone(), h);
                        model.insert(k, v);
                    }
                    Err(InsertError::DuplicateKey(_)) => {
                        prop_assert!(model.contains_key(&k));
                        prop_assert_eq!(make_calls.get(), before, "make must not run on duplicate");
                    }
                }
            }
            Op::Erase(i) => {
                let k = &pool[i];
                let got = sut.erase(k);
                let expected = model.remove(k);
                prop_assert_eq!(got.map(|(_, v)| v), expected);
                if let Some(h) = live.remove(k) {
                    stale.push(h);
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                if let Some(h) = live.remove(k) {
                    let (kk, vv) = sut.remove(h).expect("live handle removes");
                    prop_assert!(&kk == k);
                    prop_assert_eq!(Some(vv), model.remove(k));
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(k).is_none());
                }
            }
            Op::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k), live.get(k).copied());
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            Op::Mutate(i, d) => {
                let k = &pool[i];
                match (sut.get_mut(k), model.get_mut(k)) {
                    (Some(v), Some(mv)) => {
                        *v = v.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (None, None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", s, m),
                }
            }
            Op::Iterate => {
                let seen: HashMap<K, i32> = sut.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(sut.iter().count(), model.len());
                prop_assert_eq!(&seen, &model);
            }
            Op::Grow => {
                // Keep the bucket index small enough to check exhaustively.
                if !sut.is_empty() && sut.bucket_count() <= 100 {
                    let lf = sut.load_factor();
                    sut.set_max_load_factor(lf);
                }
            }
        }

        prop_assert!(sut.heads_consistent(), "bucket heads out of sync");
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        for (k, v) in &model {
            prop_assert_eq!(sut.get(k), Some(v));
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Sends every key to one bucket.
#[derive(Clone, Copy)]
struct ZeroHasher;
impl<Q: ?Sized> KeyHasher<Q> for ZeroHasher {
    fn hash_key(&self, _key: &Q) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario("[a-z]{0,3}")) {
        let sut: ChainHashMap<String, i32, StdHasher> = ChainHashMap::new();
        run_scenario(sut, &pool, ops)?;
    }

    // Worst case: every key collides, so equality alone resolves lookups.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario("[a-z]{0,3}")) {
        let sut: ChainHashMap<String, i32, ZeroHasher> = ChainHashMap::with_hasher(ZeroHasher);
        run_scenario(sut, &pool, ops)?;
    }

    // Small integers under identity hashing share buckets mod 10 and split
    // into interleaved buckets mod 100 after growth.
    #[test]
    fn prop_state_machine_identity_growth((pool, ops) in arb_scenario(0u64..300)) {
        let sut: ChainHashMap<u64, i32, IdentityHasher> = ChainHashMap::with_hasher(IdentityHasher);
        run_scenario(sut, &pool, ops)?;
    }
}
