/*
 * @file hash.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Seeded hashing of bit strings, with constant-time hashing of
 * prefixes after a linear-time pass over the string.
 */

use crate::bits::{BitVec,low_mask};
use core::hash::{Hash,Hasher};
use siphasher::sip128::{Hasher128,SipHasher13};

type BitHasher = SipHasher13;

/** A key for the SipHash13 hash function. */
pub type HasherKey = [u8; 16];

/** Domain separator for the hash */
#[derive(Hash)]
enum WhyHashing {
    DerivingKey,
    HashingBits
}

/**
 * 128-bit hash of a bit string.  Static functions are built over
 * fingerprints rather than over the strings themselves, so that
 * prefixes can be looked up without copying them.
 */
#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug,Default,PartialOrd,Ord)]
pub struct Fingerprint {
    pub h1: u64,
    pub h2: u64
}

impl Fingerprint {
    /** The low `bits` bits of the hash, used as a node signature */
    #[inline(always)]
    pub fn signature(&self, mask:u64) -> u64 { self.h1 & mask }

    /** 32-bit folding of the hash, used to flag keys needing correction */
    #[inline(always)]
    pub fn fold32(&self) -> u32 { (self.h1 ^ (self.h1 >> 32)) as u32 }
}

/** Derive a SipHash key from a 64-bit seed and a purpose label */
pub(crate) fn derive_key(seed:u64, label:u64) -> HasherKey {
    let mut hasher = BitHasher::new_with_key(&[0u8;16]);
    WhyHashing::DerivingKey.hash(&mut hasher);
    seed.hash(&mut hasher);
    label.hash(&mut hasher);
    let hash = hasher.finish128();

    let mut ret = [0u8; 16];
    ret[0..8] .copy_from_slice(&hash.h1.to_le_bytes());
    ret[8..16].copy_from_slice(&hash.h2.to_le_bytes());
    ret
}

/**
 * The seeded hash shared by a whole structure.
 *
 * The hash of a bit string feeds its complete words, then its
 * partial last word (if any), then its length.
 */
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct SeededHash {
    key: HasherKey
}

impl SeededHash {
    /** Create the hash for a given seed */
    pub fn new(seed:u64) -> Self {
        SeededHash { key: derive_key(seed, 0) }
    }

    fn start(&self) -> BitHasher {
        let mut h = BitHasher::new_with_key(&self.key);
        WhyHashing::HashingBits.hash(&mut h);
        h
    }

    /** Hash a whole bit string */
    pub fn hash(&self, v:&BitVec) -> Fingerprint {
        self.hash_prefix(v, v.len())
    }

    /** Hash `v[0..len)` without copying it */
    pub fn hash_prefix(&self, v:&BitVec, len:usize) -> Fingerprint {
        assert!(len <= v.len(), "prefix {} longer than string {}", len, v.len());
        let mut h = self.start();
        for w in &v.words()[..len/64] { h.write_u64(*w); }
        finish(h, v, len)
    }

    /** Preprocess `v` for hashing its prefixes */
    pub fn prefixes<'a>(&self, v:&'a BitVec) -> PrefixHasher<'a> {
        PrefixHasher::new(self, v)
    }
}

fn finish(mut h:BitHasher, v:&BitVec, len:usize) -> Fingerprint {
    let rem = len % 64;
    if rem != 0 { h.write_u64(v.words()[len/64] & low_mask(rem)); }
    h.write_u64(len as u64);
    let out = h.finish128();
    Fingerprint { h1: out.h1, h2: out.h2 }
}

/**
 * Hashes prefixes of one bit string.
 *
 * Construction stores the hasher state at every word boundary, so
 * `hash_prefix(g)` resumes from the state at `g/64` words and only
 * feeds the tail.
 */
pub struct PrefixHasher<'a> {
    bits: &'a BitVec,
    states: Vec<BitHasher>
}

impl <'a> PrefixHasher<'a> {
    /** Preprocess `bits` */
    pub fn new(hash:&SeededHash, bits:&'a BitVec) -> Self {
        let full = bits.len() / 64;
        let mut states = Vec::with_capacity(full+1);
        let mut h = hash.start();
        states.push(h.clone());
        for w in &bits.words()[..full] {
            h.write_u64(*w);
            states.push(h.clone());
        }
        PrefixHasher { bits: bits, states: states }
    }

    /** The string being hashed */
    pub fn bits(&self) -> &'a BitVec { self.bits }

    /** Hash of `bits[0..len)`.  Panics if `len` exceeds the string. */
    #[inline]
    pub fn hash_prefix(&self, len:usize) -> Fingerprint {
        assert!(len <= self.bits.len(), "prefix {} longer than string {}", len, self.bits.len());
        finish(self.states[len/64].clone(), self.bits, len)
    }

    /** Hash of the whole string */
    pub fn hash_all(&self) -> Fingerprint { self.hash_prefix(self.bits.len()) }
}

#[cfg(test)]
mod tests {
    use crate::bits::BitVec;
    use crate::hash::SeededHash;
    use rand::{Rng,thread_rng};

    #[test]
    fn test_prefix_hash_matches_copy() {
        let mut rng = thread_rng();
        let hash = SeededHash::new(rng.gen());
        for _ in 0..50 {
            let v : BitVec = (0..rng.gen_range(0..300)).map(|_| rng.gen::<bool>()).collect();
            let p = hash.prefixes(&v);
            for g in 0..=v.len() {
                assert_eq!(p.hash_prefix(g), hash.hash(&v.prefix(g)));
                assert_eq!(hash.hash_prefix(&v, g), p.hash_prefix(g));
            }
        }
    }

    #[test]
    fn test_seeds_and_lengths_separate() {
        let a = SeededHash::new(1);
        let b = SeededHash::new(2);
        let zero : BitVec = "0".parse().unwrap();
        let zeros : BitVec = "00".parse().unwrap();
        assert_ne!(a.hash(&zero), b.hash(&zero));
        assert_ne!(a.hash(&zero), a.hash(&zeros));
        assert_ne!(a.hash(&BitVec::new()), a.hash(&zero));
        assert_eq!(a.hash(&zero), SeededHash::new(1).hash(&zero));
    }
}
