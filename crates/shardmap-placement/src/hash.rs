//! Hash primitives used for placement
//!
//! `hash32` positions virtual nodes and probes on the ring. `jump_hash` maps
//! a key straight to a bucket without any stored table.

/// Seed for all ring hashing
const HASH_SEED: u32 = 0;

/// Multiplier of the 64-bit linear congruential generator driving `jump_hash`
const JUMP_LCG_MULTIPLIER: u64 = 2_862_933_555_777_941_757;

/// 32-bit non-cryptographic hash of a byte sequence
#[must_use]
pub fn hash32(bytes: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(bytes, HASH_SEED)
}

/// Ring position of a key, hashed from its 8-byte little-endian encoding
#[must_use]
pub fn hash_key(key: u64) -> u32 {
    hash32(&key.to_le_bytes())
}

/// Ring position of virtual node `vnode` of server `name`
///
/// The input is the decimal vnode index followed by the server name.
#[must_use]
pub fn hash_vnode(vnode: usize, name: &str) -> u32 {
    hash32(format!("{vnode}{name}").as_bytes())
}

/// Jump consistent hash (Lamping & Veach)
///
/// Maps `key` to a bucket in `[0, num_buckets)`. Growing `num_buckets` by one
/// leaves every key in place or moves it to the new last bucket.
///
/// # Panics
/// Panics if `num_buckets` is not positive.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn jump_hash(key: u64, num_buckets: i32) -> i32 {
    assert!(num_buckets > 0, "num_buckets must be positive");

    let mut k = key;
    let mut b: i64 = -1;
    let mut j: i64 = 0;

    while j < i64::from(num_buckets) {
        b = j;
        k = k.wrapping_mul(JUMP_LCG_MULTIPLIER).wrapping_add(1);
        j = ((b + 1) as f64 * (f64::from(1u32 << 31) / ((k >> 33) + 1) as f64)) as i64;
    }

    b as i32
}
