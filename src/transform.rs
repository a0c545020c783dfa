/*
 * @file transform.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Injective maps from keys to bit strings.
 */

use crate::bits::BitVec;

/**
 * Turns keys into bit strings.
 *
 * The map must be injective.  A distributor additionally needs the
 * images of its keys to be prefix-free and in the same lexicographic
 * order as the keys are iterated.
 */
pub trait TransformationStrategy<K:?Sized> {
    /** The bit string representing `key` */
    fn to_bits(&self, key:&K) -> BitVec;

    /** Bits needed to store the strategy itself */
    fn num_bits(&self) -> u64 { 0 }
}

/** Keys that already are bit strings */
#[derive(Clone,Copy,Debug,Default)]
pub struct Identity;

impl TransformationStrategy<BitVec> for Identity {
    fn to_bits(&self, key:&BitVec) -> BitVec { key.clone() }
}

/**
 * Unsigned integers as fixed-width big-endian bit strings: the most
 * significant bit comes first, so numeric order is lexicographic order.
 */
#[derive(Clone,Copy,Debug,Default)]
pub struct FixedWidth;

impl TransformationStrategy<u64> for FixedWidth {
    fn to_bits(&self, key:&u64) -> BitVec {
        (0..64).rev().map(|i| (key >> i) & 1 != 0).collect()
    }
}

impl TransformationStrategy<u32> for FixedWidth {
    fn to_bits(&self, key:&u32) -> BitVec {
        (0..32).rev().map(|i| (key >> i) & 1 != 0).collect()
    }
}

/**
 * Byte strings, prefix-free.  Each byte is written most significant
 * bit first and preceded by a `1`; the string ends with a `0`.  So
 * any byte strings, including ones that are prefixes of each other,
 * map to a prefix-free set in the same lexicographic order.
 */
#[derive(Clone,Copy,Debug,Default)]
pub struct PrefixFreeBytes;

impl <K:AsRef<[u8]>+?Sized> TransformationStrategy<K> for PrefixFreeBytes {
    fn to_bits(&self, key:&K) -> BitVec {
        let bytes = key.as_ref();
        let mut ret = BitVec::with_capacity(9*bytes.len()+1);
        for b in bytes {
            ret.push(true);
            for i in (0..8).rev() { ret.push((b >> i) & 1 != 0); }
        }
        ret.push(false);
        ret
    }
}

impl <K:?Sized, S:TransformationStrategy<K>+?Sized> TransformationStrategy<K> for &S {
    fn to_bits(&self, key:&K) -> BitVec { (**self).to_bits(key) }
    fn num_bits(&self) -> u64 { (**self).num_bits() }
}

#[cfg(test)]
mod tests {
    use crate::transform::{TransformationStrategy,FixedWidth,PrefixFreeBytes};
    use rand::{Rng,thread_rng};

    #[test]
    fn test_fixed_width_order() {
        let mut rng = thread_rng();
        for _ in 0..1000 {
            let (a,b) = (rng.gen::<u64>(), rng.gen::<u64>());
            let (x,y) = (FixedWidth.to_bits(&a), FixedWidth.to_bits(&b));
            assert_eq!(x.len(), 64);
            assert_eq!(a.cmp(&b), x.cmp(&y));
        }
        assert_eq!(FixedWidth.to_bits(&5u32).to_string(), format!("{:032b}", 5));
    }

    #[test]
    fn test_prefix_free_bytes() {
        let words = ["", "a", "ab", "abc", "abd", "b", "ba"];
        let bits : Vec<_> = words.iter().map(|w| PrefixFreeBytes.to_bits(w)).collect();
        for i in 0..words.len() {
            for j in 0..words.len() {
                assert_eq!(words[i].cmp(words[j]), bits[i].cmp(&bits[j]));
                if i != j {
                    let l = bits[i].lcp(&bits[j]);
                    assert!(l < bits[i].len() && l < bits[j].len());
                }
            }
        }
    }
}
