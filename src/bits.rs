/*
 * @file bits.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Owned bit strings, compared lexicographically.  Bit i lives in
 * word i/64 at position i%64.
 */

use core::cmp::{min,Ordering};
use core::fmt;
use core::str::FromStr;

const WORD_BITS : usize = 64;

/** Mask of the low `bits` bits of a word; `bits` may be 64 */
#[inline(always)]
pub(crate) fn low_mask(bits:usize) -> u64 {
    if bits >= WORD_BITS { !0 } else { (1u64 << bits) - 1 }
}

/**
 * A growable string of bits.
 *
 * Bits past `len` are always zero, so equal strings have equal
 * storage and the derived `Hash` and `Eq` are structural.
 */
#[derive(Clone,PartialEq,Eq,Hash,Default)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize
}

impl BitVec {
    /** An empty bit string */
    pub fn new() -> Self { BitVec::default() }

    /** An empty bit string with room for `capacity` bits */
    pub fn with_capacity(capacity:usize) -> Self {
        BitVec { words: Vec::with_capacity((capacity+63)/64), len: 0 }
    }

    /** A string of `len` zero bits */
    pub fn zeros(len:usize) -> Self {
        BitVec { words: vec![0; (len+63)/64], len: len }
    }

    /** Number of bits */
    #[inline(always)]
    pub fn len(&self) -> usize { self.len }

    /** True if there are no bits */
    #[inline(always)]
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /** Backing words; bits past `len` are zero */
    #[inline(always)]
    pub fn words(&self) -> &[u64] { &self.words }

    /** Get bit `i`.  Panics if `i >= len`. */
    #[inline(always)]
    pub fn get(&self, i:usize) -> bool {
        assert!(i < self.len, "bit index {} out of range for length {}", i, self.len);
        (self.words[i/64] >> (i%64)) & 1 != 0
    }

    /** Set bit `i` to `bit`.  Panics if `i >= len`. */
    #[inline(always)]
    pub fn set(&mut self, i:usize, bit:bool) {
        assert!(i < self.len, "bit index {} out of range for length {}", i, self.len);
        if bit { self.words[i/64] |= 1<<(i%64); }
        else   { self.words[i/64] &= !(1<<(i%64)); }
    }

    /** Append one bit */
    #[inline(always)]
    pub fn push(&mut self, bit:bool) {
        if self.len % 64 == 0 { self.words.push(0); }
        if bit { self.words[self.len/64] |= 1<<(self.len%64); }
        self.len += 1;
    }

    /** Append the low `width` bits of `value`, least significant first */
    pub fn push_bits(&mut self, value:u64, width:usize) {
        debug_assert!(width <= WORD_BITS);
        if width == 0 { return; }
        let pos = self.len;
        self.len += width;
        self.words.resize((self.len+63)/64, 0);
        self.write_bits(pos, width, value);
    }

    /** Shorten to `len` bits; does nothing if already shorter */
    pub fn truncate(&mut self, len:usize) {
        if len >= self.len { return; }
        self.len = len;
        self.words.truncate((len+63)/64);
        if len % 64 != 0 {
            let last = self.words.len()-1;
            self.words[last] &= low_mask(len%64);
        }
    }

    /** Replace the contents with a copy of `other`, reusing storage */
    pub fn replace(&mut self, other:&BitVec) {
        self.words.clear();
        self.words.extend_from_slice(&other.words);
        self.len = other.len;
    }

    /**
     * Read up to 64 bits starting at `pos`, as a word whose bit j
     * is bit `pos+j` of self.  Bits past the end read as zero.
     */
    #[inline(always)]
    pub(crate) fn word_at(&self, pos:usize) -> u64 {
        let (w,off) = (pos/64, pos%64);
        if w >= self.words.len() { return 0; }
        let lo = self.words[w] >> off;
        if off == 0 || w+1 >= self.words.len() { lo }
        else { lo | (self.words[w+1] << (64-off)) }
    }

    /** Read a `width`-bit integer stored at bit `pos` */
    #[inline(always)]
    pub fn get_bits(&self, pos:usize, width:usize) -> u64 {
        debug_assert!(pos + width <= self.len);
        if width == 0 { return 0; }
        self.word_at(pos) & low_mask(width)
    }

    /** Overwrite the `width`-bit integer stored at bit `pos` */
    pub fn set_bits(&mut self, pos:usize, width:usize, value:u64) {
        assert!(pos + width <= self.len, "field {}+{} out of range for length {}", pos, width, self.len);
        self.write_bits(pos, width, value);
    }

    fn write_bits(&mut self, pos:usize, width:usize, value:u64) {
        if width == 0 { return; }
        let mask = low_mask(width);
        let value = value & mask;
        let (w,off) = (pos/64, pos%64);
        self.words[w] = (self.words[w] & !(mask << off)) | (value << off);
        if off + width > 64 {
            let spill = off + width - 64;
            self.words[w+1] = (self.words[w+1] & !low_mask(spill)) | (value >> (64-off));
        }
    }

    /** Append bits `from..to` of `other` */
    pub fn extend_from_range(&mut self, other:&BitVec, from:usize, to:usize) {
        assert!(from <= to && to <= other.len);
        let mut pos = from;
        while pos < to {
            let width = min(WORD_BITS, to-pos);
            self.push_bits(other.word_at(pos), width);
            pos += width;
        }
    }

    /** Append all of `other` */
    pub fn extend(&mut self, other:&BitVec) {
        self.extend_from_range(other, 0, other.len);
    }

    /** Copy of bits `from..to` */
    pub fn slice(&self, from:usize, to:usize) -> BitVec {
        let mut ret = BitVec::with_capacity(to-from);
        ret.extend_from_range(self, from, to);
        ret
    }

    /** Copy of the first `len` bits */
    pub fn prefix(&self, len:usize) -> BitVec {
        let mut ret = self.clone();
        ret.truncate(len);
        ret
    }

    /** Length of the longest common prefix of self and `other` */
    pub fn lcp(&self, other:&BitVec) -> usize {
        let len = min(self.len, other.len);
        for (i,(a,b)) in self.words.iter().zip(other.words.iter()).enumerate() {
            let x = a ^ b;
            if x != 0 { return min(len, i*64 + x.trailing_zeros() as usize); }
        }
        len
    }

    /** Length of the longest common prefix of `self[offset..]` and `other` */
    pub fn lcp_at(&self, offset:usize, other:&BitVec) -> usize {
        debug_assert!(offset <= self.len);
        let len = min(self.len - offset, other.len);
        let mut i = 0;
        while i < len {
            let x = self.word_at(offset+i) ^ other.word_at(i);
            if x != 0 { return min(len, i + x.trailing_zeros() as usize); }
            i += WORD_BITS;
        }
        len
    }

    /** Position of the last one bit */
    pub fn last_one(&self) -> Option<usize> {
        for (i,w) in self.words.iter().enumerate().rev() {
            if *w != 0 { return Some(i*64 + 63 - w.leading_zeros() as usize); }
        }
        None
    }

    /** Position of the last zero bit */
    pub fn last_zero(&self) -> Option<usize> {
        for (i,w) in self.words.iter().enumerate().rev() {
            let valid = min(WORD_BITS, self.len - i*64);
            let zeros = !w & low_mask(valid);
            if zeros != 0 { return Some(i*64 + 63 - zeros.leading_zeros() as usize); }
        }
        None
    }

    /** Number of one bits */
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /**
     * Prefix-free, order-preserving encoding: each bit `b` becomes
     * `1b`, and the string is terminated by a `0`.
     */
    pub fn prefix_free(&self) -> BitVec {
        let mut ret = BitVec::with_capacity(2*self.len+1);
        for i in 0..self.len {
            ret.push(true);
            ret.push(self.get(i));
        }
        ret.push(false);
        ret
    }

    /** Iterate over the bits */
    pub fn iter(&self) -> impl Iterator<Item=bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}

impl Ord for BitVec {
    fn cmp(&self, other:&Self) -> Ordering {
        let lcp = self.lcp(other);
        if lcp < self.len && lcp < other.len {
            self.get(lcp).cmp(&other.get(lcp))
        } else {
            self.len.cmp(&other.len)
        }
    }
}

impl PartialOrd for BitVec {
    fn partial_cmp(&self, other:&Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I:IntoIterator<Item=bool>>(iter:I) -> Self {
        let mut ret = BitVec::new();
        for b in iter { ret.push(b); }
        ret
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.iter() { f.write_str(if b { "1" } else { "0" })?; }
        Ok(())
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec({})[{}]", self.len, self)
    }
}

/** Error parsing a string of `0`s and `1`s */
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct ParseBitVecError {
    /** Byte offset of the offending character */
    pub position: usize
}

impl fmt::Display for ParseBitVecError {
    fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bit character at position {}", self.position)
    }
}

impl std::error::Error for ParseBitVecError {}

impl FromStr for BitVec {
    type Err = ParseBitVecError;
    fn from_str(s:&str) -> Result<Self,Self::Err> {
        let mut ret = BitVec::with_capacity(s.len());
        for (position,c) in s.bytes().enumerate() {
            match c {
                b'0' => ret.push(false),
                b'1' => ret.push(true),
                _ => return Err(ParseBitVecError { position })
            }
        }
        Ok(ret)
    }
}
