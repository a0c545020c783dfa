/*
 * @file trie.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * The intermediate compacted trie over the bucket delimiters.  It
 * lives only while a distributor is being built: it is labelled,
 * every key is run down it once, and then it is dropped.
 */

use crate::bits::{BitVec,low_mask};
use crate::error::{Error,Result};
use crate::hash::{Fingerprint,SeededHash};
use crate::progress::{Phase,Progress};
use core::cmp::max;

/** The key exits on the left of its exit node */
pub(crate) const LEFT : u64 = 0;
/** The key exits on the right of its exit node */
pub(crate) const RIGHT : u64 = 1;

type NodeId = usize;

/**
 * A trie node.  `path` holds the bits compacted on the edge into the
 * node, not counting the branching bit that selects it.
 */
struct Node {
    children: Option<[NodeId; 2]>,
    path: BitVec
}

impl Node {
    fn leaf(path:BitVec) -> Self { Node { children: None, path: path } }
    fn is_leaf(&self) -> bool { self.children.is_none() }
}

/** Smallest k with 2^k >= x; 0 for x <= 1 */
pub(crate) fn ceil_log2(x:u64) -> u32 {
    if x <= 1 { 0 } else { 64 - (x-1).leading_zeros() }
}

/**
 * The shortest prefix length in `(parent_len, len]` that is a multiple of
 * the largest possible power of two.
 */
pub(crate) fn jump_length(parent_len:usize, len:usize) -> usize {
    let x = parent_len ^ len;
    if x == 0 { return len; }
    let msb = usize::BITS - 1 - x.leading_zeros();
    len & !(low_mask(msb as usize) as usize)
}

/** Bit widths derived from the key lengths and bucket size */
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub(crate) struct Widths {
    pub log_w: u32,
    pub log_w_mask: u64,
    pub signature_size: u32,
    pub signature_mask: u64
}

impl Widths {
    /**
     * `w` is the smallest power of two at least as large as every key
     * length, rounded so that `log2(w)` is a power of two as well.
     */
    pub fn new(max_length:usize, log2_bucket_size:u32) -> Result<Self> {
        let log_log_w = ceil_log2(max(1, ceil_log2(max_length as u64)) as u64);
        let log_w = 1u32 << log_log_w;
        let signature_size = log_log_w + log2_bucket_size;
        if log_w + signature_size > u64::BITS {
            return Err(Error::Capacity { log_w: log_w, signature_bits: signature_size });
        }
        Ok(Widths {
            log_w: log_w,
            log_w_mask: low_mask(log_w as usize),
            signature_size: signature_size,
            signature_mask: low_mask(signature_size as usize)
        })
    }

    /** Pack a signature and a length into one word */
    #[inline(always)]
    pub fn pack(&self, signature:u64, length:usize) -> u64 {
        (signature & self.signature_mask) << self.log_w | (length as u64 & self.log_w_mask)
    }

    /** Inverse of `pack` */
    #[inline(always)]
    pub fn unpack(&self, packed:u64) -> (u64,usize) {
        (packed >> self.log_w, (packed & self.log_w_mask) as usize)
    }
}

/** Check that `curr` may follow `prev` in a sorted prefix-free sequence */
pub(crate) fn check_order(prev:&BitVec, curr:&BitVec, index:u64) -> Result<()> {
    let prefix = curr.lcp(prev);
    if prefix == prev.len() && prefix == curr.len() {
        return Err(Error::NotDistinct { index: index, current: curr.clone() });
    }
    if prefix == prev.len() || prefix == curr.len() {
        return Err(Error::NotPrefixFree { index: index, previous: prev.clone(), current: curr.clone() });
    }
    if prev.get(prefix) {
        return Err(Error::NotSorted { index: index, previous: prev.clone(), current: curr.clone() });
    }
    Ok(())
}

/** What labelling the trie produces */
#[derive(Default)]
pub(crate) struct Labels {
    /** Fingerprint of the jump prefix of each internal node */
    pub jump_keys: Vec<Fingerprint>,
    /** Full root path of each internal node */
    pub representations: Vec<BitVec>,
    /** Packed (signature, path length) of each internal node */
    pub signatures: Vec<u64>,
    /** The delimiter strings, in key order */
    pub delimiters: Vec<BitVec>
}

/** Where each key leaves the trie */
#[derive(Default)]
pub(crate) struct Exits {
    /** LEFT or RIGHT, one per key */
    pub behaviour: Vec<u64>,
    /** Length of the string of the parent of the exit node, one per key */
    pub parent_lengths: Vec<u64>
}

/** A compacted binary trie over the delimiters, in an arena */
pub(crate) struct IntermediateTrie {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /** The number of keys the trie was built from */
    pub num_elements: u64,
    /** The longest key */
    pub max_length: usize,
    pub widths: Widths
}

impl IntermediateTrie {
    /**
     * Build the trie over every 2^`log2_bucket_size`-th key.  The keys
     * must be distinct, prefix-free and sorted.
     */
    pub fn build<I>(mut keys:I, log2_bucket_size:u32, progress:&mut dyn Progress) -> Result<Self>
    where I:Iterator<Item=BitVec> {
        let bucket_mask = low_mask(log2_bucket_size as usize);
        let mut trie = IntermediateTrie {
            nodes: Vec::new(),
            root: None,
            num_elements: 0,
            max_length: 0,
            widths: Widths::new(0, log2_bucket_size)?
        };

        let mut prev = match keys.next() {
            Some(first) => first,
            None => return Ok(trie) // No elements.
        };

        progress.start(Phase::BuildingTrie, None);
        progress.update();
        let mut prev_delimiter = BitVec::new();
        let mut count = 1u64;
        let mut max_length = prev.len();

        for curr in keys {
            progress.update();
            check_order(&prev, &curr, count)?;
            if count & bucket_mask == 0 {
                trie.insert(&prev, &prev_delimiter);
                prev_delimiter.replace(&prev);
            }
            prev = curr;
            max_length = max(max_length, prev.len());
            count += 1;
        }
        progress.done();

        trie.num_elements = count;
        trie.max_length = max_length;
        trie.widths = Widths::new(max_length, log2_bucket_size)?;
        tracing::debug!(
            keys = count,
            max_length = max_length,
            log_w = trie.widths.log_w,
            signature_bits = trie.widths.signature_size,
            internal_nodes = trie.internal_nodes(),
            "trie built"
        );
        Ok(trie)
    }

    fn push(&mut self, node:Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len()-1
    }

    /**
     * Insert a delimiter.  Delimiters arrive in increasing order, so
     * the new leaf always hangs off the rightmost path, at the point
     * where it diverges from the previous delimiter.
     */
    fn insert(&mut self, delimiter:&BitVec, previous:&BitVec) {
        let mut node = match self.root {
            Some(root) => root,
            None => {
                let root = self.push(Node::leaf(delimiter.clone()));
                self.root = Some(root);
                return;
            }
        };

        let mut prefix = delimiter.lcp(previous);
        let mut pos = 0;
        loop {
            let path_len = self.nodes[node].path.len();
            if prefix < path_len {
                let tail = self.nodes[node].path.slice(prefix+1, path_len);
                let split = self.push(Node { children: self.nodes[node].children, path: tail });
                let leaf = self.push(Node::leaf(delimiter.slice(pos+prefix+1, delimiter.len())));
                let n = &mut self.nodes[node];
                n.path.truncate(prefix);
                n.children = Some([split,leaf]);
                return;
            }
            match self.nodes[node].children {
                Some([_,right]) if prefix > path_len => {
                    prefix -= path_len + 1;
                    pos += path_len + 1;
                    node = right;
                },
                _ => unreachable!("delimiters must be strictly increasing")
            }
        }
    }

    /** True if the trie has no delimiters */
    pub fn is_empty(&self) -> bool { self.root.is_none() }

    /** Number of internal nodes */
    pub fn internal_nodes(&self) -> usize { self.nodes.iter().filter(|n| !n.is_leaf()).count() }

    /**
     * Walk the trie in pre-order, left before right, recording each
     * internal node's jump key, path and signature, and each leaf's
     * delimiter string.
     */
    pub fn label(&self, hash:&SeededHash, progress:&mut dyn Progress) -> Labels {
        struct Visit { node: NodeId, base_len: usize, branch: Option<bool> }

        let mut labels = Labels::default();
        let root = match self.root {
            Some(root) => root,
            None => return labels
        };

        progress.start(Phase::LabellingTrie, Some(self.nodes.len() as u64));
        let mut path = BitVec::with_capacity(self.max_length);
        let mut stack = vec![Visit { node: root, base_len: 0, branch: None }];
        while let Some(visit) = stack.pop() {
            progress.update();
            path.truncate(visit.base_len);
            if let Some(bit) = visit.branch { path.push(bit); }
            let node = &self.nodes[visit.node];

            match node.children {
                Some([left,right]) => {
                    path.extend(&node.path);
                    let len = path.len();
                    let p = jump_length(visit.base_len, len);
                    debug_assert!(len == 0 || p > visit.base_len);

                    labels.jump_keys.push(hash.hash_prefix(&path, p));
                    labels.representations.push(path.clone());
                    labels.signatures.push(self.widths.pack(hash.hash(&path).h1, len));

                    stack.push(Visit { node: right, base_len: len, branch: Some(true) });
                    stack.push(Visit { node: left, base_len: len, branch: Some(false) });
                },
                None => {
                    /* A leaf's own path is never needed; leaves reached
                     * on the left drop their trailing zeros. */
                    if visit.branch == Some(true) {
                        labels.delimiters.push(path.clone());
                    } else {
                        labels.delimiters.push(path.prefix(path.last_one().map_or(0, |i| i+1)));
                    }
                }
            }
        }
        progress.done();
        labels
    }

    /**
     * Run every key down the trie, recording the side on which it
     * leaves and the string length of the parent of its exit node.
     * Consecutive keys share the part of the descent covered by their
     * common prefix.
     */
    pub fn exits<I>(&self, keys:I, progress:&mut dyn Progress) -> Exits
    where I:Iterator<Item=BitVec> {
        let mut exits = Exits::default();
        let root = match self.root {
            Some(root) => root,
            None => return exits
        };

        progress.start(Phase::ComputingBehaviour, Some(self.num_elements));
        exits.behaviour.reserve(self.num_elements as usize);
        exits.parent_lengths.reserve(self.num_elements as usize);

        /* Nodes visited for the previous key, with the position at which
         * each one's path starts */
        let mut stack : Vec<(NodeId,usize)> = vec![(root,0)];
        let mut prev : Option<BitVec> = None;

        for curr in keys {
            progress.update();
            if let Some(prev) = &prev {
                let prefix = prev.lcp(&curr);
                while stack.len() > 1 && stack[stack.len()-1].1 > prefix { stack.pop(); }
            }
            let (mut id, mut pos) = stack[stack.len()-1];

            loop {
                let node = &self.nodes[id];
                let prefix = curr.lcp_at(pos, &node.path);
                let end = pos + node.path.len() + 1;

                /* The second case only arises for a key equal to an
                 * internal node string, which a prefix-free set excludes */
                let next = match node.children {
                    Some(children) if prefix == node.path.len() && end <= curr.len() =>
                        Some(children[curr.get(end-1) as usize]),
                    _ => None
                };

                match next {
                    Some(child) => {
                        pos = end;
                        id = child;
                        stack.push((id,pos));
                    },
                    None => {
                        let right = prefix < node.path.len() && !node.path.get(prefix);
                        exits.behaviour.push(if right { RIGHT } else { LEFT });
                        let parent_length = if stack.len() == 1 { pos } else { pos-1 };
                        exits.parent_lengths.push(parent_length as u64);
                        break;
                    }
                }
            }
            prev = Some(curr);
        }
        progress.done();
        exits
    }
}
