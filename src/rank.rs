/*
 * @file rank.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Constant-time rank over a static bit vector (Rank9 layout).
 */

use crate::bits::{BitVec,low_mask};

/** Words per basic block */
const BLOCK_WORDS : usize = 8;

/**
 * Rank structure over a bit vector.
 *
 * For each 512-bit block there are two counter words: the number of
 * ones before the block, and seven 9-bit cumulative counts of the
 * ones within the block before words 1..7.
 */
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Rank9 {
    bits: BitVec,
    counts: Vec<u64>
}

impl Rank9 {
    /** Index `bits` */
    pub fn new(bits:BitVec) -> Self {
        let words = bits.words();
        let nblocks = words.len() / BLOCK_WORDS + 1;
        let mut counts = Vec::with_capacity(2*nblocks);
        let mut total = 0u64;
        for blk in 0..nblocks {
            let mut relative = 0u64;
            let mut within = 0u64;
            for j in 0..BLOCK_WORDS {
                if j > 0 { relative |= within << (9*(j-1)); }
                within += words.get(blk*BLOCK_WORDS+j).map_or(0, |w| w.count_ones() as u64);
            }
            counts.push(total);
            counts.push(relative);
            total += within;
        }
        Rank9 { bits: bits, counts: counts }
    }

    /** Number of ones in `[0, min(pos,len))` */
    #[inline]
    pub fn rank(&self, pos:usize) -> usize {
        let pos = pos.min(self.bits.len());
        let word = pos / 64;
        let blk = word / BLOCK_WORDS;
        let sub = word % BLOCK_WORDS;
        let mut ret = self.counts[2*blk];
        if sub > 0 { ret += (self.counts[2*blk+1] >> (9*(sub-1))) & 0x1FF; }
        if pos % 64 != 0 { ret += (self.bits.words()[word] & low_mask(pos % 64)).count_ones() as u64; }
        ret as usize
    }

    /** The indexed bit vector */
    pub fn bit_vector(&self) -> &BitVec { &self.bits }

    /** Bits used by the vector and its counters */
    pub fn num_bits(&self) -> u64 {
        self.bits.len() as u64 + 64 * self.counts.len() as u64
    }
}
