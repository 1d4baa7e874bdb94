use crate::error::{EcsDbError, Result};
use bincode;
use serde;

use std::mem;

/// Encode a Rust value into bytes using bincode serialization.
pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(EcsDbError::SerializationError)
}

/// Decode bytes into a Rust value using bincode deserialization.
pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(EcsDbError::SerializationError)
}

/// Unsafe zero-copy casting from bytes to a reference of type T.
/// # Safety
/// - The byte slice must be valid for type T (correct size, alignment, and representation).
/// - The lifetime of the returned reference must not outlive the underlying bytes.
/// - The bytes must not be mutated while the reference exists.
pub unsafe fn cast_bytes_to_ref<T>(bytes: &[u8]) -> Result<&T> {
    if bytes.len() != mem::size_of::<T>() {
        return Err(EcsDbError::FieldTypeMismatch {
            expected: format!("{} bytes", mem::size_of::<T>()),
            got: format!("{} bytes", bytes.len()),
        });
    }

    let ptr = bytes.as_ptr() as *const T;
    if !(ptr as usize).is_multiple_of(mem::align_of::<T>()) {
        return Err(EcsDbError::AlignmentError {
            offset: ptr as usize % mem::align_of::<T>(),
        });
    }

    Ok(&*ptr)
}

/// Unsafe zero-copy casting from bytes to a mutable reference of type T.
/// # Safety
/// - Same as `cast_bytes_to_ref`, plus exclusive access.
pub unsafe fn cast_bytes_to_mut<T>(bytes: &mut [u8]) -> Result<&mut T> {
    if bytes.len() != mem::size_of::<T>() {
        return Err(EcsDbError::FieldTypeMismatch {
            expected: format!("{} bytes", mem::size_of::<T>()),
            got: format!("{} bytes", bytes.len()),
        });
    }

    let ptr = bytes.as_mut_ptr() as *mut T;
    if !(ptr as usize).is_multiple_of(mem::align_of::<T>()) {
        return Err(EcsDbError::AlignmentError {
            offset: ptr as usize % mem::align_of::<T>(),
        });
    }

    Ok(&mut *ptr)
}

/// Compute the size and alignment of a type at compile time.
pub fn size_and_align_of<T>() -> (usize, usize) {
    (mem::size_of::<T>(), mem::align_of::<T>())
}
