// ChainHashMap integration suite.
//
// Each test documents the behavior verified and the invariants assumed
// or asserted. Core invariants exercised:
// - Uniqueness: a present key is never stored twice; re-inserting keeps
//   the first value.
// - Round-trip: an inserted, un-erased key reads back its value.
// - Erase: the erased key disappears, every other key survives, whether
//   the erased entry headed its bucket or sat inside the run.
// - Growth: reaching the max load factor squares the bucket count on the
//   next insert (clamped at MAX_BUCKET_COUNT) and keeps every entry and
//   handle.
use chain_hashmap::{
    ChainHashMap, IdentityHasher, InsertError, DEFAULT_BUCKET_COUNT, MAX_BUCKET_COUNT,
};

fn identity<V>() -> ChainHashMap<u64, V, IdentityHasher> {
    ChainHashMap::with_hasher(IdentityHasher)
}

// Test: colliding keys under identity hashing with 10 buckets.
// Assumes: 1/11 share bucket 1, 2/22 share bucket 2.
// Verifies: all four read back; erasing 2 keeps 22 and drops 2.
#[test]
fn colliding_pairs_survive_erase() {
    let mut m = identity();
    assert_eq!(m.bucket_count(), DEFAULT_BUCKET_COUNT);
    m.insert(1, "1 1");
    m.insert(2, "2 2");
    m.insert(11, "11 11");
    m.insert(22, "22 22");

    assert_eq!(m.get(&1), Some(&"1 1"));
    assert_eq!(m.get(&2), Some(&"2 2"));
    assert_eq!(m.get(&11), Some(&"11 11"));
    assert_eq!(m.get(&22), Some(&"22 22"));

    assert_eq!(m.erase(&2), Some((2, "2 2")));
    assert_eq!(m.get(&2), None);
    assert_eq!(m.get(&22), Some(&"22 22"));
    assert_eq!(m.len(), 3);
}

// Test: forced growth.
// Assumes: max load factor pinned to the current load factor.
// Verifies: the next insert squares 10 -> 100 and all N+1 keys read back.
#[test]
fn pinned_load_factor_forces_squared_growth() {
    let mut m = identity();
    let keys = [11u64, 22, 2, 33];
    for k in keys {
        m.insert(k, format!("{k} {k}"));
    }
    assert_eq!(m.load_factor(), 0.4);

    let lf = m.load_factor();
    m.set_max_load_factor(lf);
    assert_eq!(m.max_load_factor(), 0.4);
    m.insert(3, "3 3".to_string());

    assert_eq!(m.bucket_count(), 100);
    for k in keys.into_iter().chain([3]) {
        assert_eq!(m.get(&k), Some(&format!("{k} {k}")));
    }
}

// Test: default trigger.
// Assumes: default max load factor 1.0 with 10 buckets.
// Verifies: growth happens on the 11th insert, not the 10th.
#[test]
fn default_trigger_grows_on_eleventh_insert() {
    let mut m = identity();
    for k in 0..10u64 {
        m.insert(k, k);
        assert_eq!(m.bucket_count(), 10);
    }
    m.insert(10, 10);
    assert_eq!(m.bucket_count(), 100);
    assert!(m.load_factor() < 0.2);
}

// Test: a vanishingly small max load factor.
// Assumes: every insert after the first asks to square the bucket count.
// Verifies: growth clamps at MAX_BUCKET_COUNT instead of requesting an
// impossible index, and every key still inserts, reads back and erases.
#[test]
fn tiny_load_factor_growth_is_bounded() {
    let mut m = ChainHashMap::with_buckets_and_hasher(2, IdentityHasher);
    m.set_max_load_factor(1e-12);
    for k in 0..64u64 {
        m.insert(k, k * 3);
        assert!(m.bucket_count() <= MAX_BUCKET_COUNT);
    }
    assert_eq!(m.bucket_count(), MAX_BUCKET_COUNT);
    assert_eq!(m.len(), 64);
    for k in 0..64u64 {
        assert_eq!(m.get(&k), Some(&(k * 3)));
    }
    for k in (0..64u64).step_by(2) {
        assert_eq!(m.erase(&k), Some((k, k * 3)));
    }
    assert_eq!(m.len(), 32);
    assert!(m.contains_key(&63));
    assert!(!m.contains_key(&62));
}

// Test: duplicate insert is idempotent.
// Verifies: insert(k, v1); insert(k, v2) leaves v1; try_insert reports the
// existing handle.
#[test]
fn duplicate_insert_keeps_first_value() {
    let mut m: ChainHashMap<String, i32> = ChainHashMap::new();
    let first = m.insert("k".to_string(), 1);
    let second = m.insert("k".to_string(), 2);
    assert_eq!(first, second);
    assert_eq!(m.get("k"), Some(&1));

    match m.try_insert("k".to_string(), 3) {
        Err(InsertError::DuplicateKey(h)) => assert_eq!(h, first),
        Ok(_) => panic!("expected duplicate insert to error"),
    }
    assert_eq!(m.len(), 1);
}

// Test: index access updates in place.
// Verifies: `map[&k] = v` rewrites the stored value.
#[test]
fn index_assignment_updates_value() {
    let mut m = identity();
    m.insert(1, "1 1".to_string());
    m[&1] = "abc".to_string();
    assert_eq!(m[&1], "abc");
    assert_eq!(m.len(), 1);
}

// Test: handles outlive growth and unrelated erases.
#[test]
fn handles_are_stable() {
    let mut m = identity();
    let handles: Vec<_> = (0..30u64).map(|k| (k, m.insert(k, k + 1000))).collect();
    assert_eq!(m.bucket_count(), 100);

    for k in (0..30u64).step_by(3) {
        m.erase(&k);
    }
    for (k, h) in handles {
        if k % 3 == 0 {
            assert!(h.value(&m).is_none());
        } else {
            assert_eq!(h.key(&m), Some(&k));
            assert_eq!(h.value(&m), Some(&(k + 1000)));
        }
    }
}

// Test: traversal follows the chain.
// Assumes: new keys land before their bucket head, empty buckets at the
// chain front.
// Verifies: iteration order and the Display dump.
#[test]
fn traversal_follows_chain_order() {
    let mut m = identity();
    for k in [1u64, 2, 11, 22] {
        m.insert(k, k);
    }
    let order: Vec<u64> = m.iter().map(|(_, k, _)| *k).collect();
    assert_eq!(order, vec![22, 2, 11, 1]);

    let dump = m.to_string();
    let keys: Vec<&str> = dump.lines().filter(|l| l.starts_with("key: ")).collect();
    assert_eq!(keys, vec!["key: 22", "key: 2", "key: 11", "key: 1"]);
    assert!(dump.contains("bucket: 2\n"));
}

// Test: mutable traversal order.
// Assumes: erased slots get reused by later inserts.
// Verifies: `iter_mut` and `&mut map` visit keys in the same order as
// `iter`, and report their exact length.
#[test]
fn mutable_traversal_follows_chain_order() {
    let mut m = identity();
    for k in [1u64, 2, 11, 22, 3] {
        m.insert(k, k);
    }
    m.erase(&1);
    m.erase(&3);
    m.insert(21, 21);
    m.insert(5, 5);
    let order: Vec<u64> = m.iter().map(|(_, k, _)| *k).collect();
    assert_eq!(order, vec![5, 22, 2, 21, 11]);

    assert_eq!(m.iter_mut().len(), m.len());
    let mutable: Vec<u64> = m.iter_mut().map(|(_, k, _)| *k).collect();
    assert_eq!(mutable, order);

    let mut visited = Vec::new();
    for (_, k, v) in &mut m {
        *v *= 2;
        visited.push(*k);
    }
    assert_eq!(visited, order);
    assert_eq!(m.get(&21), Some(&42));
}

// Test: erasing every key in arbitrary order empties every bucket.
#[test]
fn erase_everything() {
    let mut m = identity();
    let keys: Vec<u64> = (0..50).map(|i| (i * 37) % 211).collect();
    for &k in &keys {
        m.insert(k, k);
    }
    for (n, &k) in keys.iter().rev().enumerate() {
        assert_eq!(m.erase(&k), Some((k, k)));
        assert_eq!(m.erase(&k), None);
        assert_eq!(m.len(), keys.len() - n - 1);
        for &rest in &keys[..keys.len() - n - 1] {
            assert_eq!(m.get(&rest), Some(&rest));
        }
    }
    assert!(m.is_empty());
    assert_eq!(m.iter().count(), 0);
}

// Test: a custom hash function is used as-is.
// Verifies: a constant hash keeps the map correct.
#[test]
fn constant_hash_function_is_still_correct() {
    let mut m = ChainHashMap::with_hasher(|_: &u32| 42u64);
    for k in 0..20u32 {
        m.insert(k, k * 2);
    }
    m.erase(&7);
    m.erase(&19);
    m.erase(&0);
    for k in 0..20u32 {
        let expected = if [0, 7, 19].contains(&k) { None } else { Some(k * 2) };
        assert_eq!(m.get(&k).copied(), expected);
    }
}
