/*
 * @file cffi.rs
 * @author Mike Hamburg
 * @copyright 2020-2022 Rambus Inc.
 *
 * C foreign function interface, over byte-string keys.
 */

use crate::{DistributorOptions,PrefixFreeBytes,ZFastTrieDistributor};
use core::ptr::NonNull;

/// Rust version of a vector of bytes
pub type Bytes = Box<[u8]>;

/// Distributor over byte strings, in bytewise lexicographic order
pub type BytesDistributor = ZFastTrieDistributor<[u8],PrefixFreeBytes>;

unsafe fn ptr_to_slice<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if len == 0 { &[] } else { std::slice::from_raw_parts(ptr,len) }
}

/****************************************************************************
 * key lists
 ****************************************************************************/

#[no_mangle]
/// Create a new, empty list of keys
pub extern fn zfd_keys_new() -> *mut Vec<Bytes> {
    Box::into_raw(Box::new(Vec::new()))
}

#[no_mangle]
/// Count the keys in a list
pub unsafe extern fn zfd_keys_len(ptr: NonNull<Vec<Bytes>>) -> usize {
    ptr.as_ref().len()
}

#[no_mangle]
/// Append a copy of a key to a list
pub unsafe extern fn zfd_keys_push(mut ptr: NonNull<Vec<Bytes>>, key: *const u8, key_len: usize) {
    ptr.as_mut().push(ptr_to_slice(key,key_len).to_vec().into_boxed_slice());
}

#[no_mangle]
/// Sort a list of keys bytewise.  Duplicates are kept, and will make building fail.
pub unsafe extern fn zfd_keys_sort(mut ptr: NonNull<Vec<Bytes>>) {
    ptr.as_mut().sort();
}

#[no_mangle]
/// Free a list of keys
pub unsafe extern fn zfd_keys_free(ptr: *mut Vec<Bytes>) {
    if !ptr.is_null() { drop(Box::from_raw(ptr)); }
}

/****************************************************************************
 * distributors
 ****************************************************************************/

#[no_mangle]
/// Build a distributor over a sorted list of distinct keys, with buckets of
/// 2^log2_bucket_size keys.  If use_seed, construction is deterministic
/// given seed.  Return NULL on failure.
pub unsafe extern fn zfd_distributor_bytes_build(
    keys: NonNull<Vec<Bytes>>,
    log2_bucket_size: u32,
    use_seed: bool,
    seed: u64
) -> *mut BytesDistributor {
    let options = DistributorOptions {
        log2_bucket_size: log2_bucket_size,
        seed: if use_seed { Some(seed) } else { None },
        ..DistributorOptions::default()
    };
    match BytesDistributor::build(keys.as_ref(), PrefixFreeBytes, &options) {
        Ok(distributor) => Box::into_raw(Box::new(distributor)),
        Err(err) => {
            tracing::error!(error = %err, "could not build distributor");
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
/// Look up the bucket of a key, or -1
pub unsafe extern fn zfd_distributor_bytes_get(
    ptr: NonNull<BytesDistributor>,
    key: *const u8, key_len: usize
) -> i64 {
    ptr.as_ref().get(ptr_to_slice(key,key_len))
}

#[no_mangle]
/// Number of keys the distributor was built on
pub unsafe extern fn zfd_distributor_bytes_len(ptr: NonNull<BytesDistributor>) -> u64 {
    ptr.as_ref().len()
}

#[no_mangle]
/// Number of bucket boundaries
pub unsafe extern fn zfd_distributor_bytes_num_delimiters(ptr: NonNull<BytesDistributor>) -> u64 {
    ptr.as_ref().num_delimiters()
}

#[no_mangle]
/// Bits of storage used by the distributor
pub unsafe extern fn zfd_distributor_bytes_num_bits(ptr: NonNull<BytesDistributor>) -> u64 {
    ptr.as_ref().num_bits()
}

#[no_mangle]
/// Destroy and free a distributor
pub unsafe extern fn zfd_distributor_bytes_free(ptr: *mut BytesDistributor) {
    if !ptr.is_null() { drop(Box::from_raw(ptr)); }
}

#[cfg(test)]
mod tests {
    use crate::cffi::*;
    use core::ptr::NonNull;

    #[test]
    fn test_cffi_roundtrip() {
        let words : Vec<String> = (0..500u32).map(|i| format!("key{}", i*7919 % 100003)).collect();
        unsafe {
            let keys = NonNull::new(zfd_keys_new()).unwrap();
            for w in &words { zfd_keys_push(keys, w.as_ptr(), w.len()); }
            zfd_keys_push(keys, std::ptr::null(), 0);
            zfd_keys_sort(keys);
            assert_eq!(zfd_keys_len(keys), words.len()+1);

            let d = NonNull::new(zfd_distributor_bytes_build(keys, 3, true, 5)).unwrap();
            assert_eq!(zfd_distributor_bytes_len(d), words.len() as u64 + 1);
            for (i,k) in keys.as_ref().iter().enumerate() {
                assert_eq!(zfd_distributor_bytes_get(d, k.as_ptr(), k.len()), (i >> 3) as i64);
            }
            assert!(zfd_distributor_bytes_num_bits(d) > 0);
            assert_eq!(zfd_distributor_bytes_num_delimiters(d), words.len() as u64 >> 3);
            zfd_distributor_bytes_free(d.as_ptr());

            /* Duplicates fail */
            zfd_keys_push(keys, b"key0".as_ptr(), 4);
            zfd_keys_sort(keys);
            assert!(zfd_distributor_bytes_build(keys, 3, true, 5).is_null());
            zfd_keys_free(keys.as_ptr());
        }
    }
}
