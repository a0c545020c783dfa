/*
 * @file distributor.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Z-fast trie distributors: map each key of a sorted set to its bucket.
 */

use crate::bits::{BitVec,low_mask};
use crate::error::{Error,Result};
use crate::function::{BuildOptions,StaticFunction};
use crate::hash::{Fingerprint,PrefixHasher,SeededHash,derive_key};
use crate::monotone::LcpMonotoneHash;
use crate::progress::{Phase,Progress,TracingProgress};
use crate::rank::Rank9;
use crate::transform::TransformationStrategy;
use crate::trie::{IntermediateTrie,Widths,LEFT};
use core::borrow::Borrow;
use core::marker::PhantomData;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::{BTreeSet,HashSet};

/** Expected vertices per key of a static function */
const GAMMA : f64 = 1.23;

/** Labels for deriving the static functions' keys from the seed */
const BEHAVIOUR_LABEL : u64 = 1;
const RANKER_LABEL : u64 = 2;
const SIGNATURE_LABEL : u64 = 3;
const CORRECTION_LABEL : u64 = 4;

/**
 * Options to build a [`ZFastTrieDistributor`].
 *
 * Implements `Default`, so you can get reasonable options
 * with `DistributorOptions::default()`.
 */
#[derive(Copy,Clone,PartialEq,Eq,Debug)]
pub struct DistributorOptions {
    /**
     * Log base 2 of the bucket size.  Must be less than 32.
     *
     * Default: 0, i.e. every key is its own bucket.
     */
    pub log2_bucket_size: u32,

    /**
     * Seed for every hash in the structure.  If given, construction
     * is deterministic.  If omitted, a fresh seed is drawn from the
     * operating system.
     *
     * Default: `None`.
     */
    pub seed: Option<u64>,

    /**
     * How many times to try building each static function.
     *
     * Default: 256.
     */
    pub max_tries: usize
}

impl Default for DistributorOptions {
    fn default() -> Self {
        DistributorOptions {
            log2_bucket_size: 0,
            seed: None,
            max_tries: 256
        }
    }
}

impl DistributorOptions {
    /** Options for the static function identified by `label` */
    fn function_options(&self, label:u64, bits_per_value:Option<u8>) -> BuildOptions {
        BuildOptions {
            max_tries: self.max_tries,
            try_num: 0,
            key_gen: self.seed.map(|s| derive_key(s, label)),
            bits_per_value: bits_per_value
        }
    }
}

/** What happened during construction */
#[derive(Copy,Clone,PartialEq,Eq,Debug,Default)]
pub struct BuildStats {
    /** Keys for which the hashed search found the wrong length */
    pub mistakes: u64,
    /** Keys corrected only because their signature collides with a mistake */
    pub false_positives: u64,
    /** Internal nodes of the trie over the delimiters */
    pub internal_nodes: u64,
    /** Strings in the leaf ranker */
    pub ranker_keys: u64
}

/** The parts used to locate a key's exit node, present when the trie has an internal node */
#[derive(Clone,Debug)]
struct ApproximateTrie {
    widths: Widths,
    /** Jump key -> packed (signature, node string length) */
    signatures: StaticFunction<Fingerprint>,
    ranker: LcpMonotoneHash,
    /** Which ranker keys are delimiters */
    leaves: Rank9,
    /** Exact lengths of the keys flagged in `mistake_signatures` */
    corrections: StaticFunction<Fingerprint>,
    mistake_signatures: HashSet<u32>
}

impl ApproximateTrie {
    /**
     * The string length of the parent of the key's exit node, found by
     * a binary search on the node signatures.  If `correct`, keys
     * flagged as mistakes are answered exactly instead.
     */
    fn exit_length(&self, key:&PrefixHasher, correct:bool) -> usize {
        if correct && !self.mistake_signatures.is_empty() {
            let fp = key.hash_all();
            if self.mistake_signatures.contains(&fp.fold32()) {
                return self.corrections.query(&fp) as usize;
            }
        }
        search_exit_length(&self.widths, &self.signatures, key)
    }

    fn num_bits_for_mistakes(&self) -> u64 {
        self.corrections.num_bits() + 32 * self.mistake_signatures.len() as u64
    }

    fn num_bits(&self) -> u64 {
        self.signatures.num_bits()
            + self.ranker.num_bits()
            + self.leaves.num_bits()
            + self.num_bits_for_mistakes()
    }
}

/** Binary search over the 2-fattest prefix lengths of `key`, checking node signatures */
fn search_exit_length(widths:&Widths, signatures:&StaticFunction<Fingerprint>, key:&PrefixHasher) -> usize {
    let len = key.bits().len();
    if len == 0 { return 0; }
    let (mut l, mut r) = (0usize, len);
    let mut i = (usize::BITS - 1 - len.leading_zeros()) as i32;
    while r - l > 1 && i >= 0 {
        if (l >> i) & 1 != ((r-1) >> i) & 1 {
            let f = (r-1) & !(low_mask(i as usize) as usize);
            let (signature, g) = widths.unpack(signatures.query(&key.hash_prefix(f)));
            if g > len {
                r = f;
            } else if g >= f && signature == key.hash_prefix(g).signature(widths.signature_mask) {
                l = g;
            } else {
                r = f;
            }
        }
        i -= 1;
    }
    l
}

/**
 * A distributor.
 *
 * Built from a sorted, prefix-free sequence of keys and a bucket size
 * B = 2^b, it maps the key at position `i` to `i >> b`, while storing
 * only a small amount of data per bucket.  Keys outside the set map
 * to an arbitrary bucket, or to -1.
 */
pub struct ZFastTrieDistributor<K:?Sized, S> {
    transform: S,
    hash: SeededHash,
    size: u64,
    log2_bucket_size: u32,
    num_delimiters: u64,
    /** LEFT or RIGHT for each key; None if there are no delimiters */
    behaviour: Option<StaticFunction<Fingerprint>>,
    trie: Option<ApproximateTrie>,
    stats: BuildStats,
    _phantom: PhantomData<fn(&K)>
}

/** Everything but the transform, as assembled */
#[derive(Default)]
struct Parts {
    size: u64,
    num_delimiters: u64,
    behaviour: Option<StaticFunction<Fingerprint>>,
    trie: Option<ApproximateTrie>,
    stats: BuildStats
}

impl Parts {
    /** Compare the space used by each part with its expected size */
    fn log_space(&self, log2_bucket_size:u32) {
        let (approx, behaviour) = match (&self.trie, &self.behaviour) {
            (Some(approx), Some(behaviour)) => (approx, behaviour),
            _ => return
        };
        let size = self.size as f64;
        let bucket = (1u64 << log2_bucket_size) as f64;
        let log_w = approx.widths.log_w as f64;
        tracing::debug!(
            forecast = (GAMMA + log_w + bucket.log2() + log_w.log2()) / bucket,
            actual = approx.signatures.num_bits() as f64 / size,
            "signature bits per element"
        );
        tracing::debug!(actual = approx.ranker.num_bits() as f64 / size, "ranker bits per element");
        tracing::debug!(
            forecast = 3.0 / bucket,
            actual = approx.leaves.num_bits() as f64 / size,
            "leaves bits per element"
        );
        tracing::debug!(
            forecast = bucket.log2() / bucket + 2.0 * GAMMA / bucket,
            actual = approx.num_bits_for_mistakes() as f64 / size,
            "mistake bits per element"
        );
        tracing::debug!(
            forecast = GAMMA,
            actual = behaviour.num_bits() as f64 / size,
            "behaviour bits per element"
        );
    }
}

/** The three ranker keys around an internal node string */
fn push_ranker_keys(set:&mut BTreeSet<BitVec>, bv:&BitVec) {
    set.insert(bv.prefix(bv.last_one().map_or(0, |i| i+1)));

    let mut plus = bv.clone();
    plus.push(true);
    set.insert(plus);

    if let Some(z) = bv.last_zero() {
        let mut next = bv.prefix(z+1);
        next.set(z, true);
        set.insert(next);
    }
}

/** Mark which of the sorted `ranker_keys` are delimiters */
fn mark_delimiters(ranker_keys:&[BitVec], delimiters:&[BitVec]) -> BitVec {
    let mut marks = BitVec::zeros(ranker_keys.len());
    let mut delims = delimiters.iter().peekable();
    for (q,key) in ranker_keys.iter().enumerate() {
        while let Some(d) = delims.peek() {
            match (*d).cmp(key) {
                core::cmp::Ordering::Less => { delims.next(); },
                core::cmp::Ordering::Equal => { marks.set(q, true); break; },
                core::cmp::Ordering::Greater => break
            }
        }
    }
    debug_assert_eq!(marks.count_ones(), delimiters.len(), "every delimiter is a ranker key");
    marks
}

impl <K:?Sized, S:TransformationStrategy<K>> ZFastTrieDistributor<K,S> {
    /**
     * Build a distributor, reporting progress through `tracing`.
     *
     * The images of `keys` under `transform` must be distinct,
     * prefix-free and lexicographically increasing.
     */
    pub fn build<Q:Borrow<K>>(keys:&[Q], transform:S, options:&DistributorOptions) -> Result<Self> {
        Self::build_with_progress(keys, transform, options, &mut TracingProgress::new())
    }

    /** Build a distributor, reporting progress to `progress` */
    pub fn build_with_progress<Q:Borrow<K>>(
        keys:&[Q],
        transform:S,
        options:&DistributorOptions,
        progress:&mut dyn Progress
    ) -> Result<Self> {
        let b = options.log2_bucket_size;
        if b >= 32 { return Err(Error::BucketSize(b)); }
        let seed = options.seed.unwrap_or_else(|| OsRng.next_u64());
        let hash = SeededHash::new(seed);
        let parts = Self::assemble(keys, &transform, hash, options, progress)?;
        parts.log_space(b);
        Ok(ZFastTrieDistributor {
            transform: transform,
            hash: hash,
            size: parts.size,
            log2_bucket_size: b,
            num_delimiters: parts.num_delimiters,
            behaviour: parts.behaviour,
            trie: parts.trie,
            stats: parts.stats,
            _phantom: PhantomData::default()
        })
    }

    fn assemble<Q:Borrow<K>>(
        keys:&[Q],
        transform:&S,
        hash:SeededHash,
        options:&DistributorOptions,
        progress:&mut dyn Progress
    ) -> Result<Parts> {
        let b = options.log2_bucket_size;
        let bits = || keys.iter().map(|k| transform.to_bits(k.borrow()));

        let trie = IntermediateTrie::build(bits(), b, progress)?;
        let mut ret = Parts { size: trie.num_elements, ..Parts::default() };
        if trie.is_empty() {
            tracing::debug!(keys = ret.size, "no delimiters");
            return Ok(ret);
        }

        let labels = trie.label(&hash, progress);
        let exits = trie.exits(bits(), progress);
        let widths = trie.widths;
        drop(trie);
        ret.num_delimiters = labels.delimiters.len() as u64;
        ret.stats.internal_nodes = labels.representations.len() as u64;

        let fingerprints : Vec<Fingerprint> = bits().map(|k| hash.hash(&k)).collect();
        let behaviour = StaticFunction::<Fingerprint>::build(
            &fingerprints, &exits.behaviour,
            &mut options.function_options(BEHAVIOUR_LABEL, Some(1))
        ).ok_or(Error::FunctionBuild { what: "behaviour", keys: fingerprints.len(), tries: options.max_tries })?;
        ret.behaviour = Some(behaviour);
        drop(exits.behaviour);

        if labels.representations.is_empty() {
            tracing::debug!(keys = ret.size, "one delimiter; no internal nodes");
            return Ok(ret);
        }

        progress.start(Phase::ComputingRankerKeys, Some(labels.representations.len() as u64));
        let mut ranker_set = BTreeSet::new();
        for bv in &labels.representations {
            push_ranker_keys(&mut ranker_set, bv);
            progress.update();
        }
        progress.done();
        let ranker_keys : Vec<BitVec> = ranker_set.into_iter().collect();
        ret.stats.ranker_keys = ranker_keys.len() as u64;

        progress.start(Phase::BuildingRanker, Some(ranker_keys.len() as u64));
        let leaves = Rank9::new(mark_delimiters(&ranker_keys, &labels.delimiters));
        let ranker = LcpMonotoneHash::build(&ranker_keys, &hash, &options.function_options(RANKER_LABEL, None))
            .ok_or(Error::FunctionBuild { what: "ranker", keys: ranker_keys.len(), tries: options.max_tries })?;
        progress.done();
        drop(ranker_keys);

        progress.start(Phase::BuildingSignatures, Some(labels.jump_keys.len() as u64));
        let signature_bits = (widths.log_w + widths.signature_size) as u8;
        let signatures = StaticFunction::<Fingerprint>::build(
            &labels.jump_keys, &labels.signatures,
            &mut options.function_options(SIGNATURE_LABEL, Some(signature_bits))
        ).ok_or(Error::FunctionBuild { what: "signature", keys: labels.jump_keys.len(), tries: options.max_tries })?;
        progress.done();
        drop(labels);

        /* Keys the hashed search gets wrong */
        progress.start(Phase::SearchingMistakes, Some(ret.size));
        let mut mistake_signatures = HashSet::new();
        let mut mistakes = 0u64;
        for (key,exact) in bits().zip(exits.parent_lengths.iter()) {
            let prefixes = hash.prefixes(&key);
            if search_exit_length(&widths, &signatures, &prefixes) as u64 != *exact {
                tracing::trace!(key = %key, exact = *exact, "mistake");
                mistake_signatures.insert(prefixes.hash_all().fold32());
                mistakes += 1;
            }
            progress.update();
        }
        progress.done();

        let percent = 100.0 * mistakes as f64 / ret.size as f64;
        tracing::info!(mistakes = mistakes, percent = percent, "errors");
        if 2*mistakes > ret.size {
            tracing::warn!(
                mistakes = mistakes,
                percent = percent,
                log2_bucket_size = b,
                "more than half of the keys need correction; the bucket size is too small for these keys"
            );
        }

        /* Every key whose signature matches a mistake is corrected */
        progress.start(Phase::SearchingFalsePositives, Some(ret.size));
        let mut positives = Vec::new();
        let mut lengths = Vec::new();
        if !mistake_signatures.is_empty() {
            for (key,exact) in bits().zip(exits.parent_lengths.iter()) {
                let fp = hash.hash(&key);
                if mistake_signatures.contains(&fp.fold32()) {
                    positives.push(fp);
                    lengths.push(*exact);
                }
                progress.update();
            }
        }
        progress.done();
        drop(exits.parent_lengths);

        let false_positives = positives.len() as u64 - mistakes;
        match positives.len() {
            0 => tracing::info!(false_positives = false_positives, "false errors"),
            n => tracing::info!(
                false_positives = false_positives,
                percent = 100 * false_positives / n as u64,
                "false errors"
            )
        }

        progress.start(Phase::BuildingCorrections, Some(positives.len() as u64));
        let corrections = StaticFunction::<Fingerprint>::build(
            &positives, &lengths,
            &mut options.function_options(CORRECTION_LABEL, Some(widths.log_w as u8))
        ).ok_or(Error::FunctionBuild { what: "correction", keys: positives.len(), tries: options.max_tries })?;
        progress.done();

        ret.stats.mistakes = mistakes;
        ret.stats.false_positives = false_positives;
        ret.trie = Some(ApproximateTrie {
            widths: widths,
            signatures: signatures,
            ranker: ranker,
            leaves: leaves,
            corrections: corrections,
            mistake_signatures: mistake_signatures
        });
        Ok(ret)
    }

    /**
     * The bucket of `key`.  For a key of the build set this is its
     * position divided by the bucket size.  Other keys get an
     * arbitrary bucket, or -1.
     */
    pub fn get(&self, key:&K) -> i64 {
        self.get_bits(&self.transform.to_bits(key))
    }

    /** The bucket of a key that has already been transformed */
    pub fn get_bits(&self, key:&BitVec) -> i64 {
        let behaviour = match &self.behaviour {
            None => return 0,
            Some(behaviour) => behaviour
        };
        let prefixes = self.hash.prefixes(key);
        let b = behaviour.query(&prefixes.hash_all());
        let approx = match &self.trie {
            None => return b as i64,
            Some(approx) => approx
        };

        let length = approx.exit_length(&prefixes, true);
        if length >= key.len() { return -1; }
        let mut candidate = key.prefix(length);
        let bit = key.get(length);

        if b == LEFT {
            if bit { candidate.push(true); }
            else {
                match candidate.last_one() {
                    /* Exits at the left of 0^k: below every delimiter */
                    None => return 0,
                    Some(o) => candidate.truncate(o+1)
                }
            }
        } else if bit {
            match candidate.last_zero() {
                /* Exits at the right of 1^k */
                None => return self.num_delimiters as i64,
                Some(z) => {
                    candidate.truncate(z+1);
                    candidate.set(z, true);
                }
            }
        } else {
            candidate.push(true);
        }
        approx.leaves.rank(approx.ranker.get(&candidate) as usize) as i64
    }

    /** Number of keys the distributor was built on */
    pub fn len(&self) -> u64 { self.size }

    /** True if it was built on no keys */
    pub fn is_empty(&self) -> bool { self.size == 0 }

    /** Number of bucket boundaries; buckets are numbered `0..=num_delimiters()` */
    pub fn num_delimiters(&self) -> u64 { self.num_delimiters }

    /** True if the trie over the delimiters has no internal node */
    pub fn empty_trie(&self) -> bool { self.trie.is_none() }

    /** True if all keys fit in one bucket */
    pub fn no_delimiters(&self) -> bool { self.behaviour.is_none() }

    /** Log base 2 of the bucket size */
    pub fn log2_bucket_size(&self) -> u32 { self.log2_bucket_size }

    /** Construction statistics */
    pub fn stats(&self) -> &BuildStats { &self.stats }

    /** Bits of storage used by all the parts */
    pub fn num_bits(&self) -> u64 {
        self.behaviour.as_ref().map_or(0, |f| f.num_bits())
            + self.trie.as_ref().map_or(0, ApproximateTrie::num_bits)
            + self.transform.num_bits()
    }
}

#[cfg(test)]
mod tests {
    use crate::bits::BitVec;
    use crate::distributor::{ZFastTrieDistributor,DistributorOptions};
    use crate::error::Error;
    use crate::progress::NoProgress;
    use crate::transform::{TransformationStrategy,FixedWidth,Identity,PrefixFreeBytes};
    use crate::trie::IntermediateTrie;
    use rand::{Rng,SeedableRng,thread_rng};
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn options(log2_bucket_size:u32, seed:u64) -> DistributorOptions {
        DistributorOptions { log2_bucket_size: log2_bucket_size, seed: Some(seed), ..DistributorOptions::default() }
    }

    fn bitvecs(strs:&[&str]) -> Vec<BitVec> {
        strs.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn random_u64s(rng:&mut impl Rng, n:usize) -> Vec<u64> {
        let mut set = BTreeSet::new();
        while set.len() < n { set.insert(rng.gen::<u64>()); }
        set.into_iter().collect()
    }

    #[test]
    fn test_example() {
        let keys = bitvecs(&["0001","0010","0100","0101","1000","1001","1100"]);
        for seed in 0..8 {
            let d = ZFastTrieDistributor::<BitVec,_>::build_with_progress(
                &keys, Identity, &options(1, seed), &mut NoProgress
            ).unwrap();
            assert_eq!(d.len(), 7);
            assert_eq!(d.num_delimiters(), 3);
            assert!(!d.empty_trie());
            assert_eq!(d.stats().internal_nodes, 2);
            assert_eq!(d.stats().ranker_keys, 3);
            for (i,k) in keys.iter().enumerate() {
                assert_eq!(d.get(k), (i/2) as i64, "key {} with seed {}", k, seed);
            }
        }
    }

    #[test]
    fn test_random_u64() {
        let mut rng = thread_rng();
        let keys = random_u64s(&mut rng, 3000);
        for b in 0..=11 {
            let d = ZFastTrieDistributor::<u64,_>::build_with_progress(
                &keys, FixedWidth, &options(b, rng.gen()), &mut NoProgress
            ).unwrap();
            assert_eq!(d.num_delimiters(), (keys.len() as u64 - 1) >> b);
            let mut last = 0;
            for (i,k) in keys.iter().enumerate() {
                let got = d.get(k);
                assert_eq!(got, (i >> b) as i64, "key {} at {} with b={}", k, i, b);
                assert!(got >= last);
                last = got;
            }
        }
    }

    #[test]
    fn test_byte_strings() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut words : Vec<Vec<u8>> = (0..2000).map(|_| {
            let len = rng.gen_range(0..12);
            (0..len).map(|_| rng.gen_range(b'a'..=b'f')).collect()
        }).collect();
        words.sort();
        words.dedup();
        for b in [0,2,5] {
            let d = ZFastTrieDistributor::<[u8],_>::build_with_progress(
                &words, PrefixFreeBytes, &options(b, 99), &mut NoProgress
            ).unwrap();
            for (i,w) in words.iter().enumerate() {
                assert_eq!(d.get(w.as_slice()), (i >> b) as i64);
            }
            assert!(d.num_bits() > 0);
        }
    }

    #[test]
    fn test_key_below_root_path() {
        /* "0" leaves the trie on the left of the root, whose path is "1" */
        let keys = bitvecs(&["0","100","101","110","111"]);
        for b in 0..=2 {
            for seed in 0..64 {
                let d = ZFastTrieDistributor::<BitVec,_>::build_with_progress(
                    &keys, Identity, &options(b, seed), &mut NoProgress
                ).unwrap();
                for (i,k) in keys.iter().enumerate() {
                    assert_eq!(d.get(k), (i >> b) as i64, "key {} with b={} seed {}", k, b, seed);
                }
            }
        }
    }

    #[test]
    fn test_varying_lengths_shared_prefix() {
        let mut rng = thread_rng();
        let mut set = BTreeSet::new();
        while set.len() < 2000 {
            let mut k : BitVec = "1101".parse().unwrap();
            for _ in 0..rng.gen_range(0..40) { k.push(rng.gen()); }
            set.insert(k);
        }
        /* Sorted, so a key that is a prefix of another is a prefix of its successor */
        let sorted : Vec<BitVec> = set.into_iter().collect();
        let mut keys = vec!["0".parse::<BitVec>().unwrap()];
        for (i,k) in sorted.iter().enumerate() {
            match sorted.get(i+1) {
                Some(next) if next.lcp(k) == k.len() => {},
                _ => keys.push(k.clone())
            }
        }

        let n = keys.len();
        for b in 0..=(usize::BITS - 1 - n.leading_zeros()) {
            let d = ZFastTrieDistributor::<BitVec,_>::build_with_progress(
                &keys, Identity, &options(b, rng.gen()), &mut NoProgress
            ).unwrap();
            assert_eq!(d.num_delimiters(), (n as u64 - 1) >> b);
            for (i,k) in keys.iter().enumerate() {
                assert_eq!(d.get(k), (i >> b) as i64, "key {} at {} with b={}", k, i, b);
            }
        }
    }

    #[test]
    fn test_not_found() {
        /* Internal nodes "" and "001"; the jump key of "001" is "00" */
        let keys = bitvecs(&["00100","00110","10","11"]);
        for seed in 0..32 {
            let d = ZFastTrieDistributor::<BitVec,_>::build_with_progress(
                &keys, Identity, &options(0, seed), &mut NoProgress
            ).unwrap();
            assert_eq!(d.stats().internal_nodes, 2);
            assert_eq!(d.get_bits(&BitVec::new()), -1);
            assert_eq!(d.get(&"001".parse().unwrap()), -1, "seed {}", seed);
            for (i,k) in keys.iter().enumerate() { assert_eq!(d.get(k), i as i64); }
        }
    }

    #[test]
    fn test_degenerate() {
        let none : Vec<u64> = vec![];
        let d = ZFastTrieDistributor::<u64,_>::build(&none, FixedWidth, &options(2, 0)).unwrap();
        assert!(d.is_empty());
        assert!(d.no_delimiters());
        assert!(d.empty_trie());
        assert_eq!(d.get(&12345), 0);

        /* n <= B */
        let keys : Vec<u64> = vec![3, 9, 27, 81];
        let d = ZFastTrieDistributor::<u64,_>::build(&keys, FixedWidth, &options(2, 0)).unwrap();
        assert!(d.no_delimiters());
        assert!(d.empty_trie());
        for k in &keys { assert_eq!(d.get(k), 0); }

        /* B < n <= 2B: one delimiter */
        for n in 5..=8 {
            let keys : Vec<u64> = (0..n).map(|i| 1000 + 7*i).collect();
            let d = ZFastTrieDistributor::<u64,_>::build(&keys, FixedWidth, &options(2, n)).unwrap();
            assert!(!d.no_delimiters());
            assert!(d.empty_trie());
            assert_eq!(d.num_delimiters(), 1);
            for (i,k) in keys.iter().enumerate() {
                assert_eq!(d.get(k), (i/4) as i64);
            }
        }
    }

    #[test]
    fn test_malformed_input() {
        let dup = bitvecs(&["0001","0001"]);
        let err = ZFastTrieDistributor::<BitVec,_>::build(&dup, Identity, &options(0, 0)).err();
        assert!(matches!(err, Some(Error::NotDistinct { index: 1, .. })));

        let unsorted : Vec<u64> = vec![1, 5, 3];
        let err = ZFastTrieDistributor::<u64,_>::build(&unsorted, FixedWidth, &options(0, 0)).err();
        assert!(matches!(err, Some(Error::NotSorted { index: 2, .. })));

        let prefix = bitvecs(&["01","011"]);
        let err = ZFastTrieDistributor::<BitVec,_>::build(&prefix, Identity, &options(0, 0)).err();
        assert!(matches!(err, Some(Error::NotPrefixFree { index: 1, .. })));

        let err = ZFastTrieDistributor::<u64,_>::build(&[1u64, 2], FixedWidth, &options(32, 0)).err();
        assert_eq!(err, Some(Error::BucketSize(32)));
    }

    #[test]
    fn test_mistake_correction() {
        let mut rng = StdRng::seed_from_u64(1234);
        let keys = random_u64s(&mut rng, 5000);
        let d = ZFastTrieDistributor::<u64,_>::build_with_progress(
            &keys, FixedWidth, &options(0, 42), &mut NoProgress
        ).unwrap();
        let approx = d.trie.as_ref().unwrap();
        assert!(d.stats().mistakes > 0);

        let bits = || keys.iter().map(|k| FixedWidth.to_bits(k));
        let trie = IntermediateTrie::build(bits(), 0, &mut NoProgress).unwrap();
        let exact = trie.exits(bits(), &mut NoProgress).parent_lengths;

        /* Without correction, exactly the recorded mistakes come out wrong */
        let mut mismatches = 0;
        let mut flagged = 0;
        for (k,exact) in bits().zip(exact.iter()) {
            let prefixes = d.hash.prefixes(&k);
            let is_flagged = approx.mistake_signatures.contains(&prefixes.hash_all().fold32());
            if approx.exit_length(&prefixes, false) as u64 != *exact {
                mismatches += 1;
                assert!(is_flagged);
            }
            assert_eq!(approx.exit_length(&prefixes, true) as u64, *exact);
            if is_flagged { flagged += 1; }
        }
        assert_eq!(mismatches, d.stats().mistakes);
        assert_eq!(flagged, d.stats().mistakes + d.stats().false_positives);
        assert_eq!(approx.corrections.len() as u64, flagged);

        for (i,k) in keys.iter().enumerate() { assert_eq!(d.get(k), i as i64); }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut rng = StdRng::seed_from_u64(5);
        let keys = random_u64s(&mut rng, 1000);
        let a = ZFastTrieDistributor::<u64,_>::build(&keys, FixedWidth, &options(3, 77)).unwrap();
        let b = ZFastTrieDistributor::<u64,_>::build(&keys, FixedWidth, &options(3, 77)).unwrap();
        assert_eq!(a.num_bits(), b.num_bits());
        assert_eq!(a.stats(), b.stats());
        for _ in 0..1000 {
            let query = rng.gen::<u64>();
            let got = a.get(&query);
            assert_eq!(got, b.get(&query));
            assert!(got >= -1 && got <= a.num_delimiters() as i64);
        }
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T:Send+Sync>() {}
        assert_send_sync::<ZFastTrieDistributor<u64,FixedWidth>>();
        assert_send_sync::<ZFastTrieDistributor<[u8],PrefixFreeBytes>>();
    }
}
