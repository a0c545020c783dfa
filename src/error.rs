/*
 * @file error.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * Errors from building a distributor.
 */

use crate::bits::BitVec;
use thiserror::Error;

/** Why a distributor could not be built. */
#[derive(Debug,Error,Clone,PartialEq,Eq)]
pub enum Error {
    /** Key `index` has the same bits as its predecessor */
    #[error("the input bit vectors are not distinct: key {index} ({current}) equals its predecessor")]
    NotDistinct { index: u64, current: BitVec },

    /** One of keys `index-1`, `index` is a proper prefix of the other */
    #[error("the input bit vectors are not prefix-free: key {index} ({current}) and its predecessor ({previous})")]
    NotPrefixFree { index: u64, previous: BitVec, current: BitVec },

    /** Key `index` sorts before its predecessor */
    #[error("the input bit vectors are not lexicographically sorted: key {index} ({current}) precedes its predecessor ({previous})")]
    NotSorted { index: u64, previous: BitVec, current: BitVec },

    /** The packed signature and length do not fit in a word */
    #[error("signature of {signature_bits} bits plus length of {log_w} bits exceeds 64 bits")]
    Capacity { log_w: u32, signature_bits: u32 },

    /** The bucket size exponent is too large */
    #[error("log2 bucket size {0} is too large (at most 31)")]
    BucketSize(u32),

    /** A static function could not be built in the allotted tries */
    #[error("could not build the {what} function on {keys} keys after {tries} tries")]
    FunctionBuild { what: &'static str, keys: usize, tries: usize },
}

/** Result type for building distributors. */
pub type Result<T> = std::result::Result<T, Error>;
