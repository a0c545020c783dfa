/*
 * @file function.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Static functions: compressed maps from a fixed key set to
 * fixed-width values, with the keys removed.  Built by peeling a
 * random 3-hypergraph.
 */

use crate::bits::{BitVec,low_mask};
use crate::hash::HasherKey;
use core::hash::Hash;
use core::marker::PhantomData;
use rand::RngCore;
use rand::rngs::OsRng;
use siphasher::sip128::{Hasher128,SipHasher13};

/** Space of responses in dictionary impl. */
pub type Response = u64;

type EdgeHasher = SipHasher13;
type Vertex = u32;

/** Vertices per key, times 100 */
const GAMMA_PERCENT : usize = 123;

/** Domain separator for the hash */
#[derive(Hash)]
enum WhyHashing {
    HashingInput,
    DerivingNewKey
}

/** Result of hashing an item: one vertex in each third of the graph */
#[derive(Clone,Copy)]
struct Edge {
    vertices: [Vertex; 3]
}

/** Multiply-shift a 32-bit hash into `0..n` */
#[inline(always)]
fn reduce(x:u64, n:usize) -> Vertex {
    (((x & 0xFFFFFFFF) * n as u64) >> 32) as Vertex
}

/** The outer-main hash function: hash an object to an Edge */
fn hash_object_to_edge<K:Hash+?Sized>(key:&HasherKey, part_size:usize, k:&K) -> Edge {
    let mut h = EdgeHasher::new_with_key(key);
    WhyHashing::HashingInput.hash(&mut h);
    k.hash(&mut h);
    let hash = h.finish128();
    let p = part_size as Vertex;
    Edge { vertices: [
        reduce(hash.h1, part_size),
        p + reduce(hash.h1 >> 32, part_size),
        2*p + reduce(hash.h2, part_size)
    ]}
}

/** Number of vertices in each third of the graph for `nitems` keys */
pub fn part_size(nitems:usize) -> usize {
    (nitems * GAMMA_PERCENT + 299) / 300 + 1
}

/**
 * Utility: either generate a fresh hash key, or derive one from an existing
 * key and index.
 */
pub(crate) fn choose_key(base_key: Option<HasherKey>, n:usize) -> HasherKey {
    match base_key {
        None => {
            let mut key = [0u8; 16];
            OsRng.fill_bytes(&mut key);
            key
        },
        Some(key) => {
            let mut hasher = EdgeHasher::new_with_key(&key);
            WhyHashing::DerivingNewKey.hash(&mut hasher);
            n.hash(&mut hasher);
            let hash = hasher.finish128();

            let mut ret = [0u8; 16];
            ret[0..8] .copy_from_slice(&hash.h1.to_le_bytes());
            ret[8..16].copy_from_slice(&hash.h2.to_le_bytes());
            ret
        }
    }
}

/**
 * Options to build a [`StaticFunction`].
 *
 * Implements `Default`, so you can get reasonable options
 * with `BuildOptions::default()`.
 */
#[derive(Copy,Clone,PartialEq,Eq,Debug,Ord,PartialOrd)]
pub struct BuildOptions{
    /**
     * How many times to try building the function?
     *
     * Peeling fails for a small fraction of hash keys, more often
     * for tiny key sets.  The builder will automatically try up to
     * this number of times.
     *
     * Building always fails if the keys are not unique.
     *
     * Default: 256.
     */
    pub max_tries : usize,

    /**
     * In-out-parameter from build.
     *
     * On which try did the build succeed?  If passed in
     * as nonzero, the counter starts here.  Mostly useful
     * for diagnostics.
     */
    pub try_num: usize,

    /**
     * Optional hash key to make building deterministic.
     * If a key is given, then the actual key used will be
     * derived from that key and from `try_num`.
     * If omitted, a fresh random key will be selected for
     * each try.
     *
     * Default: `None`.
     */
    pub key_gen : Option<HasherKey>,

    /**
     * Override the number of bits to return per value.
     * If given, all values will be truncated to that many
     * least-significant bits.  If omitted, the bit length
     * of the largest input value will be used.
     *
     * Default: `None`.
     */
    pub bits_per_value : Option<u8>
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            key_gen : None,
            max_tries : 256,
            bits_per_value : None,
            try_num: 0
        }
    }
}

/**
 * Peel the hypergraph.  Returns the edges in peeling order together
 * with the vertex each one was peeled from, or None if the graph has
 * a nonempty 2-core.
 */
fn peel(edges:&[Edge], nvertices:usize) -> Option<Vec<(u32,Vertex)>> {
    let mut degree = vec![0u32; nvertices];
    let mut xor_edges = vec![0u32; nvertices];
    for (e,edge) in edges.iter().enumerate() {
        for v in edge.vertices {
            degree[v as usize] += 1;
            xor_edges[v as usize] ^= e as u32;
        }
    }

    let mut stack : Vec<Vertex> = (0..nvertices as Vertex).filter(|v| degree[*v as usize] == 1).collect();
    let mut order = Vec::with_capacity(edges.len());
    while let Some(v) = stack.pop() {
        if degree[v as usize] != 1 { continue; }
        let e = xor_edges[v as usize];
        order.push((e,v));
        for u in edges[e as usize].vertices {
            degree[u as usize] -= 1;
            xor_edges[u as usize] ^= e;
            if degree[u as usize] == 1 { stack.push(u); }
        }
    }

    if order.len() == edges.len() { Some(order) } else { None }
}

/**
 * Compressed static function.
 *
 * Maps each key of the set it was built from to its value, in about
 * 1.23 * `bits_per_value` bits per key.  Querying any other key
 * returns an arbitrary value of the same bit width.
 */
#[derive(Eq,PartialEq,Clone,Debug)]
pub struct StaticFunction<K:?Sized> {
    /** The SipHash key used to hash inputs. */
    hash_key: HasherKey,

    /** The number of bits stored per (key,value) pair. */
    bits_per_value: usize,

    /** Vertices per third of the hypergraph */
    part_size: usize,

    /** Number of keys */
    nitems: usize,

    /** One packed value per vertex */
    values: BitVec,

    /** Phantom to hold the type of K */
    _phantom: PhantomData<fn(&K)>
}

impl <K:Hash+?Sized> StaticFunction<K> {
    /**
     * Build a static function.
     *
     * `keys` and `values` are parallel; the keys must be distinct.
     * Values are truncated to the chosen bit width.  Returns None if
     * no try succeeded.
     */
    pub fn build<Q>(keys:&[Q], values:&[Response], options:&mut BuildOptions) -> Option<Self>
    where Q:core::borrow::Borrow<K> {
        assert_eq!(keys.len(), values.len(), "keys and values must be parallel");

        /* Get the number of bits required */
        let bits_per_value = match options.bits_per_value {
            None => {
                let range = values.iter().fold(0, |acc,v| acc | v);
                (Response::BITS - range.leading_zeros()) as usize
            },
            Some(bpv) => bpv as usize
        };
        let nitems = keys.len();
        let part = part_size(nitems);

        if nitems == 0 || bits_per_value == 0 {
            return Some(StaticFunction {
                hash_key: choose_key(options.key_gen, options.try_num),
                bits_per_value: 0,
                part_size: part,
                nitems: nitems,
                values: BitVec::new(),
                _phantom: PhantomData::default()
            });
        }

        let mask = low_mask(bits_per_value);
        for try_num in options.try_num..options.max_tries {
            let hkey = choose_key(options.key_gen, try_num);
            let edges : Vec<Edge> = keys.iter()
                .map(|k| hash_object_to_edge(&hkey, part, k.borrow()))
                .collect();

            /* Solve it! */
            let order = match peel(&edges, 3*part) {
                Some(order) => order,
                None => continue
            };
            let mut packed = BitVec::zeros(3*part*bits_per_value);
            for &(e,v) in order.iter().rev() {
                let mut x = values[e as usize] & mask;
                for u in edges[e as usize].vertices {
                    if u != v { x ^= packed.get_bits(u as usize*bits_per_value, bits_per_value); }
                }
                packed.set_bits(v as usize*bits_per_value, bits_per_value, x);
            }

            options.try_num = try_num;
            return Some(StaticFunction {
                hash_key: hkey,
                bits_per_value: bits_per_value,
                part_size: part,
                nitems: nitems,
                values: packed,
                _phantom: PhantomData::default()
            });
        }

        None // Fail!
    }

    /**
     * Query an item in the function.
     * If (key,v) was included when building it, then v will be returned.
     * Otherwise, an arbitrary value will be returned.
     */
    pub fn query(&self, key:&K) -> Response {
        if self.bits_per_value == 0 { return 0; }
        let edge = hash_object_to_edge(&self.hash_key, self.part_size, key);
        let w = self.bits_per_value;
        edge.vertices.iter().fold(0, |acc,v| acc ^ self.values.get_bits(*v as usize*w, w))
    }

    /** Number of keys the function was built on */
    pub fn len(&self) -> usize { self.nitems }

    /** True if it was built on no keys */
    pub fn is_empty(&self) -> bool { self.nitems == 0 }

    /** Width of the stored values */
    pub fn bits_per_value(&self) -> usize { self.bits_per_value }

    /** Bits of storage used, including the hash key */
    pub fn num_bits(&self) -> u64 {
        self.values.len() as u64 + 8 * core::mem::size_of::<HasherKey>() as u64
    }
}

#[cfg(test)]
mod tests {
    use crate::function::{StaticFunction,BuildOptions};
    use rand::{thread_rng,Rng};
    use std::collections::HashSet;

    #[test]
    fn test_static_function() {
        let mut rng = thread_rng();
        for i in 0..10 {
            let mut set = HashSet::new();
            for _j in 0..99*i { set.insert(rng.gen::<u64>()); }
            let keys : Vec<u64> = set.into_iter().collect();
            let values : Vec<u64> = keys.iter().map(|_| rng.gen::<u8>() as u64).collect();
            let mut options = BuildOptions::default();
            let f = StaticFunction::<u64>::build(&keys, &values, &mut options).unwrap();
            assert_eq!(f.len(), keys.len());
            for (k,v) in keys.iter().zip(values.iter()) {
                assert_eq!(f.query(k), *v);
            }
        }
    }

    #[test]
    fn test_deterministic_with_key() {
        let keys : Vec<u64> = (0..1000).collect();
        let values : Vec<u64> = keys.iter().map(|k| k.wrapping_mul(0x9E3779B97F4A7C15)).collect();
        let mut options = BuildOptions::default();
        options.key_gen = Some([7u8;16]);
        let a = StaticFunction::<u64>::build(&keys, &values, &mut options.clone()).unwrap();
        let b = StaticFunction::<u64>::build(&keys, &values, &mut options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bits_per_value(), 64);
        for (k,v) in keys.iter().zip(values.iter()) { assert_eq!(b.query(k), *v); }
    }

    #[test]
    fn test_truncated_and_empty() {
        let keys : Vec<u64> = (0..300).collect();
        let values : Vec<u64> = keys.iter().map(|k| k * 3).collect();
        let mut options = BuildOptions::default();
        options.bits_per_value = Some(4);
        let f = StaticFunction::<u64>::build(&keys, &values, &mut options).unwrap();
        for (k,v) in keys.iter().zip(values.iter()) { assert_eq!(f.query(k), v & 15); }

        let zeros = vec![0u64; keys.len()];
        let z = StaticFunction::<u64>::build(&keys, &zeros, &mut BuildOptions::default()).unwrap();
        assert_eq!(z.bits_per_value(), 0);
        assert_eq!(z.query(&5), 0);

        let empty = StaticFunction::<u64>::build::<u64>(&[], &[], &mut BuildOptions::default()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.query(&17), 0);
    }

    #[test]
    fn test_duplicates_fail() {
        let keys = vec![1u64, 2, 2];
        let values = vec![0u64, 1, 1];
        let mut options = BuildOptions::default();
        options.max_tries = 16;
        assert!(StaticFunction::<u64>::build(&keys, &values, &mut options).is_none());
    }
}
