/*
 * @file monotone.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Monotone minimal perfect hashing of sorted bit strings by
 * longest-common-prefix bucketing.
 */

use crate::bits::{BitVec,low_mask};
use crate::function::{BuildOptions,StaticFunction,choose_key};
use crate::hash::{Fingerprint,SeededHash};
use crate::trie::ceil_log2;
use core::cmp::{max,min};

/** Labels for deriving the keys of the two functions */
const LCP_LABEL : usize = 0x6c6370;
const BUCKET_LABEL : usize = 0x62756b;

/**
 * Maps each of a strictly increasing sequence of bit strings to its
 * position in the sequence.
 *
 * The strings are prefix-free encoded and cut into buckets of
 * 2^`log2_bucket` consecutive strings.  Within a bucket every string
 * shares the bucket's longest common prefix, and no two buckets have
 * the same one.  So one function gives each string its bucket's lcp
 * length and its offset, and another maps the lcp itself to the bucket.
 *
 * Strings outside the sequence get an arbitrary position.
 */
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct LcpMonotoneHash {
    hash: SeededHash,
    log2_bucket: u32,
    lcp_offset: StaticFunction<Fingerprint>,
    bucket: StaticFunction<Fingerprint>,
    nkeys: usize
}

impl LcpMonotoneHash {
    /**
     * Build on `keys`, which must be strictly increasing.  Returns None
     * if a function could not be built in `options.max_tries` tries.
     */
    pub fn build(keys:&[BitVec], hash:&SeededHash, options:&BuildOptions) -> Option<Self> {
        debug_assert!(keys.windows(2).all(|w| w[0] < w[1]), "keys must be strictly increasing");
        let encoded : Vec<BitVec> = keys.iter().map(BitVec::prefix_free).collect();
        let max_len = encoded.iter().map(BitVec::len).max().unwrap_or(0);
        let log2_bucket = if keys.len() <= 1 { 0 } else {
            ceil_log2(max(1, ceil_log2(max(2, max_len) as u64)) as u64)
        };

        let mut lcp_keys = Vec::with_capacity(keys.len());
        let mut lcp_values = Vec::with_capacity(keys.len());
        let mut bucket_keys = Vec::new();
        let mut bucket_values = Vec::new();
        let bucket_size = 1usize << log2_bucket;
        for (i,chunk) in encoded.chunks(bucket_size).enumerate() {
            let (first,last) = (&chunk[0], &chunk[chunk.len()-1]);
            let lcp = if chunk.len() == 1 { first.len() } else { first.lcp(last) };
            for (offset,enc) in chunk.iter().enumerate() {
                lcp_keys.push(hash.hash(enc));
                lcp_values.push((lcp as u64) << log2_bucket | offset as u64);
            }
            bucket_keys.push(hash.hash_prefix(first, lcp));
            bucket_values.push(i as u64);
        }

        let mut lcp_options = BuildOptions {
            key_gen: options.key_gen.map(|k| choose_key(Some(k), LCP_LABEL)),
            bits_per_value: None,
            ..*options
        };
        let lcp_offset = StaticFunction::<Fingerprint>::build(&lcp_keys, &lcp_values, &mut lcp_options)?;

        let mut bucket_options = BuildOptions {
            key_gen: options.key_gen.map(|k| choose_key(Some(k), BUCKET_LABEL)),
            bits_per_value: None,
            ..*options
        };
        let bucket = StaticFunction::<Fingerprint>::build(&bucket_keys, &bucket_values, &mut bucket_options)?;

        Some(LcpMonotoneHash {
            hash: *hash,
            log2_bucket: log2_bucket,
            lcp_offset: lcp_offset,
            bucket: bucket,
            nkeys: keys.len()
        })
    }

    /** The position of `key` in the sequence it was built from */
    pub fn get(&self, key:&BitVec) -> u64 {
        if self.nkeys == 0 { return 0; }
        let enc = key.prefix_free();
        let prefixes = self.hash.prefixes(&enc);
        let packed = self.lcp_offset.query(&prefixes.hash_all());
        let offset = packed & low_mask(self.log2_bucket as usize);
        let lcp = min((packed >> self.log2_bucket) as usize, enc.len());
        let bucket = self.bucket.query(&prefixes.hash_prefix(lcp));
        bucket << self.log2_bucket | offset
    }

    /** Number of strings it was built on */
    pub fn len(&self) -> usize { self.nkeys }

    /** True if it was built on no strings */
    pub fn is_empty(&self) -> bool { self.nkeys == 0 }

    /** Bits of storage used */
    pub fn num_bits(&self) -> u64 {
        self.lcp_offset.num_bits() + self.bucket.num_bits() + 64
    }
}

#[cfg(test)]
mod tests {
    use crate::bits::BitVec;
    use crate::function::BuildOptions;
    use crate::hash::SeededHash;
    use crate::monotone::LcpMonotoneHash;
    use rand::{Rng,SeedableRng};
    use rand::rngs::StdRng;

    fn random_sorted(rng:&mut StdRng, n:usize, max_len:usize) -> Vec<BitVec> {
        let mut keys : Vec<BitVec> = (0..n).map(|_| {
            let len = rng.gen_range(0..=max_len);
            (0..len).map(|_| rng.gen::<bool>()).collect()
        }).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    #[test]
    fn test_monotone_random() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for &(n,max_len) in &[(1,5), (2,3), (50,8), (1000,40), (3000,200)] {
            let keys = random_sorted(&mut rng, n, max_len);
            let hash = SeededHash::new(rng.gen());
            let mph = LcpMonotoneHash::build(&keys, &hash, &BuildOptions::default()).unwrap();
            assert_eq!(mph.len(), keys.len());
            for (i,k) in keys.iter().enumerate() {
                assert_eq!(mph.get(k), i as u64, "key {} of {}", k, keys.len());
            }
        }
    }

    #[test]
    fn test_monotone_prefixes() {
        /* Several keys are prefixes of their successors */
        let keys : Vec<BitVec> = ["", "0", "00", "001", "0011", "01", "1", "11"]
            .iter().map(|s| s.parse().unwrap()).collect();
        let hash = SeededHash::new(3);
        let mut options = BuildOptions::default();
        options.key_gen = Some([1u8; 16]);
        let mph = LcpMonotoneHash::build(&keys, &hash, &options).unwrap();
        for (i,k) in keys.iter().enumerate() { assert_eq!(mph.get(k), i as u64); }
        assert_eq!(mph, LcpMonotoneHash::build(&keys, &hash, &options).unwrap());
    }

    #[test]
    fn test_monotone_empty() {
        let mph = LcpMonotoneHash::build(&[], &SeededHash::new(0), &BuildOptions::default()).unwrap();
        assert!(mph.is_empty());
        assert_eq!(mph.get(&"0101".parse().unwrap()), 0);
    }
}
