/*!
 * Z-fast trie distributors.
 *
 * This crate provides a [`ZFastTrieDistributor<K,S>`] object.  It is
 * built from a sorted sequence of keys and a bucket size B = 2<sup>b</sup>,
 * and maps the key at position `i` in the sequence to its bucket `i >> b`.
 * Like the compressed maps it is meant to sit beneath, it does not store
 * the keys: it uses a few bits per bucket, nearly independent of how long
 * the keys are.  As a result, it cannot tell whether a key was in the
 * set it was built from.  Other keys map to an arbitrary bucket, or to -1.
 *
 * Distributors are the first stage of monotone minimal perfect hashing:
 * once a key's bucket is known, a small per-bucket function finds its
 * position within the bucket.
 *
 * # Keys
 *
 * Keys are turned into bit strings by a [`TransformationStrategy`].  The
 * images of the keys must be distinct, prefix-free (no key a proper
 * prefix of another) and in increasing lexicographic order.  Building
 * checks this, and fails with an [`Error`] naming the offending keys.
 *
 * * [`FixedWidth`] writes integers big-endian, so sorted integers work.
 * * [`PrefixFreeBytes`] encodes byte strings, so any sorted set of
 *   distinct byte strings or `str`s works.
 * * [`Identity`] takes [`BitVec`]s as they are.
 *
 * # Internals
 *
 * Every B-th key is a *delimiter*, and a compacted binary trie is built
 * over the delimiters.  For each key, a one-bit *behaviour* function
 * records whether it leaves the trie to the left or right of its exit
 * node.  The trie itself is discarded: instead each internal node is
 * stored in a static function keyed by a hash of a power-of-two-aligned
 * prefix of its string, giving a short signature of the string and its
 * length.  A query finds its exit node by a binary search over prefix
 * lengths, as in a z-fast trie, and then ranks a string derived from the
 * exit point among the strings around the trie's nodes.
 *
 * The signatures are short, so the search is occasionally wrong.
 * Construction finds every key it is wrong for, and stores the correct
 * answer for them (and for keys whose hashes collide with theirs) in
 * another static function, so that every key of the set is answered
 * exactly.
 *
 * The static functions are built by peeling random 3-hypergraphs, and
 * the ranking uses a monotone minimal perfect hash.  Both are available
 * on their own as [`StaticFunction`] and [`LcpMonotoneHash`].
 *
 * # Failure
 *
 * Building the static functions is probabilistic, and each is retried up
 * to [`DistributorOptions::max_tries`] times.  With the default options a
 * failure is negligibly unlikely.
 *
 * # Logging
 *
 * Construction reports its phases through [`tracing`], or through any
 * other [`Progress`] passed to [`ZFastTrieDistributor::build_with_progress`].
 */

mod bits;
mod hash;
mod function;
mod monotone;
mod rank;
mod transform;
mod trie;
mod distributor;
mod progress;
mod error;

pub use bits::{BitVec,ParseBitVecError};
pub use hash::{Fingerprint,SeededHash,PrefixHasher,HasherKey};
pub use function::{StaticFunction,BuildOptions,Response};
pub use monotone::LcpMonotoneHash;
pub use rank::Rank9;
pub use transform::{TransformationStrategy,Identity,FixedWidth,PrefixFreeBytes};
pub use distributor::{ZFastTrieDistributor,DistributorOptions,BuildStats};
pub use progress::{Progress,Phase,TracingProgress,NoProgress};
pub use error::{Error,Result};

#[cfg(feature="cffi")]
pub mod cffi;
