//! Property kinds
//!
//! Every class property has one storage kind. A kind knows its byte
//! footprint inside an instance buffer and implements only the accessor
//! forms that make sense for it; hitting any other form means the caller
//! supplied a property id of the wrong kind, which is a hard fault in a
//! compiled program and aborts.

use std::fmt;
use std::mem::{self, ManuallyDrop};

use once_cell::sync::Lazy;

use crate::logic::LogicVector;
use crate::object::ObjectRef;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Storage kind of one class property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Real,
    Str,
    Object,
}

static KIND_TAGS: Lazy<FastHashMap<&'static str, PropertyKind>> = Lazy::new(|| {
    let mut map = fast_hash_map_new();
    map.insert("b8", PropertyKind::UInt8);
    map.insert("b16", PropertyKind::UInt16);
    map.insert("b32", PropertyKind::UInt32);
    map.insert("b64", PropertyKind::UInt64);
    map.insert("sb8", PropertyKind::Int8);
    map.insert("sb16", PropertyKind::Int16);
    map.insert("sb32", PropertyKind::Int32);
    map.insert("sb64", PropertyKind::Int64);
    map.insert("r", PropertyKind::Real);
    map.insert("S", PropertyKind::Str);
    map.insert("o", PropertyKind::Object);
    map
});

impl PropertyKind {
    /// Resolve a compiled kind tag. Unknown tags yield `None`; the caller
    /// defers the error until the class shape is frozen.
    pub fn from_tag(tag: &str) -> Option<PropertyKind> {
        KIND_TAGS.get(tag).copied()
    }

    /// The compiled tag this kind was declared with.
    pub fn tag(self) -> &'static str {
        match self {
            PropertyKind::UInt8 => "b8",
            PropertyKind::UInt16 => "b16",
            PropertyKind::UInt32 => "b32",
            PropertyKind::UInt64 => "b64",
            PropertyKind::Int8 => "sb8",
            PropertyKind::Int16 => "sb16",
            PropertyKind::Int32 => "sb32",
            PropertyKind::Int64 => "sb64",
            PropertyKind::Real => "r",
            PropertyKind::Str => "S",
            PropertyKind::Object => "o",
        }
    }

    /// Bytes one property of this kind occupies inside an instance buffer.
    pub fn size(self) -> usize {
        match self {
            PropertyKind::UInt8 | PropertyKind::Int8 => 1,
            PropertyKind::UInt16 | PropertyKind::Int16 => 2,
            PropertyKind::UInt32 | PropertyKind::Int32 => 4,
            PropertyKind::UInt64 | PropertyKind::Int64 => 8,
            PropertyKind::Real => mem::size_of::<f64>(),
            PropertyKind::Str => mem::size_of::<String>(),
            PropertyKind::Object => mem::size_of::<ObjectRef>(),
        }
    }

    /// True for the fixed-width integer kinds, the only kinds with a vector
    /// form.
    pub fn is_integral(self) -> bool {
        !matches!(self, PropertyKind::Real | PropertyKind::Str | PropertyKind::Object)
    }

    /// Initialize this property's bytes in place. The buffer arrives
    /// zero-filled, which already is the constructed state of the integer
    /// and real atoms; only the owning kinds write a value in.
    pub(crate) fn construct(self, buf: &mut [u8], offset: usize) {
        match self {
            PropertyKind::Str => unsafe { write_at::<String>(buf, offset, String::new()) },
            PropertyKind::Object => unsafe { write_at::<ObjectRef>(buf, offset, ObjectRef::nil()) },
            _ => {}
        }
    }

    /// Tear this property's bytes down in place, releasing anything the
    /// property owns.
    pub(crate) fn destruct(self, buf: &mut [u8], offset: usize) {
        match self {
            PropertyKind::Str => unsafe { drop(take_at::<String>(buf, offset)) },
            PropertyKind::Object => unsafe { drop(take_at::<ObjectRef>(buf, offset)) },
            _ => {}
        }
    }

    /// Store a four-state vector as this kind's fixed-width integer. Every
    /// digit must be 0 or 1; integer storage has no undefined state. Digits
    /// past the kind's width are discarded, narrower vectors zero-extend.
    pub(crate) fn set_vec4(self, buf: &mut [u8], offset: usize, val: &LogicVector) {
        if !val.is_fully_defined() {
            panic!("x/z digit in value stored into {} property", self.tag());
        }
        let word = val.value_word(0);
        match self {
            PropertyKind::UInt8 | PropertyKind::Int8 => unsafe { write_at::<u8>(buf, offset, word as u8) },
            PropertyKind::UInt16 | PropertyKind::Int16 => unsafe { write_at::<u16>(buf, offset, word as u16) },
            PropertyKind::UInt32 | PropertyKind::Int32 => unsafe { write_at::<u32>(buf, offset, word as u32) },
            PropertyKind::UInt64 | PropertyKind::Int64 => unsafe { write_at::<u64>(buf, offset, word) },
            other => panic!("vector store unsupported for {} property", other.tag()),
        }
    }

    /// Read this kind's integer back as a vector of width `8 * size()`,
    /// assembled from machine words.
    pub(crate) fn get_vec4(self, buf: &[u8], offset: usize) -> LogicVector {
        let word: u64 = match self {
            PropertyKind::UInt8 | PropertyKind::Int8 => unsafe { read_at::<u8>(buf, offset) as u64 },
            PropertyKind::UInt16 | PropertyKind::Int16 => unsafe { read_at::<u16>(buf, offset) as u64 },
            PropertyKind::UInt32 | PropertyKind::Int32 => unsafe { read_at::<u32>(buf, offset) as u64 },
            PropertyKind::UInt64 | PropertyKind::Int64 => unsafe { read_at::<u64>(buf, offset) },
            other => panic!("vector load unsupported for {} property", other.tag()),
        };
        LogicVector::from_words(&[word], 8 * self.size())
    }

    pub(crate) fn set_real(self, buf: &mut [u8], offset: usize, val: f64) {
        match self {
            PropertyKind::Real => unsafe { write_at::<f64>(buf, offset, val) },
            other => panic!("real store unsupported for {} property", other.tag()),
        }
    }

    pub(crate) fn get_real(self, buf: &[u8], offset: usize) -> f64 {
        match self {
            PropertyKind::Real => unsafe { read_at::<f64>(buf, offset) },
            other => panic!("real load unsupported for {} property", other.tag()),
        }
    }

    pub(crate) fn set_str(self, buf: &mut [u8], offset: usize, val: &str) {
        match self {
            PropertyKind::Str => unsafe {
                drop(take_at::<String>(buf, offset));
                write_at::<String>(buf, offset, val.to_owned());
            },
            other => panic!("string store unsupported for {} property", other.tag()),
        }
    }

    pub(crate) fn get_str(self, buf: &[u8], offset: usize) -> String {
        match self {
            PropertyKind::Str => unsafe { peek_at::<String, _>(buf, offset, |s| s.clone()) },
            other => panic!("string load unsupported for {} property", other.tag()),
        }
    }

    pub(crate) fn set_object(self, buf: &mut [u8], offset: usize, val: &ObjectRef) {
        match self {
            PropertyKind::Object => unsafe {
                drop(take_at::<ObjectRef>(buf, offset));
                write_at::<ObjectRef>(buf, offset, val.clone());
            },
            other => panic!("object store unsupported for {} property", other.tag()),
        }
    }

    pub(crate) fn get_object(self, buf: &[u8], offset: usize) -> ObjectRef {
        match self {
            PropertyKind::Object => unsafe { peek_at::<ObjectRef, _>(buf, offset, |o| o.clone()) },
            other => panic!("object load unsupported for {} property", other.tag()),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// In-place storage primitives. The layout engine hands out byte offsets with
// no alignment promise, so every access must go through the unaligned
// pointer forms.
//
// Safety contract shared by all four: the caller matches `T` to the bytes at
// `offset` per the owning slot's kind, and for `take_at` the value at the
// offset is initialized and not read again afterwards.

unsafe fn write_at<T>(buf: &mut [u8], offset: usize, value: T) {
    assert!(offset + mem::size_of::<T>() <= buf.len());
    unsafe { buf.as_mut_ptr().add(offset).cast::<T>().write_unaligned(value) }
}

unsafe fn read_at<T: Copy>(buf: &[u8], offset: usize) -> T {
    assert!(offset + mem::size_of::<T>() <= buf.len());
    unsafe { buf.as_ptr().add(offset).cast::<T>().read_unaligned() }
}

unsafe fn take_at<T>(buf: &mut [u8], offset: usize) -> T {
    assert!(offset + mem::size_of::<T>() <= buf.len());
    unsafe { buf.as_ptr().add(offset).cast::<T>().read_unaligned() }
}

/// Borrow the value at `offset` without moving it out: the bits are copied
/// into a `ManuallyDrop` shell, handed to `with`, and never dropped here,
/// so the buffer keeps sole ownership.
unsafe fn peek_at<T, R>(buf: &[u8], offset: usize, with: impl FnOnce(&T) -> R) -> R {
    assert!(offset + mem::size_of::<T>() <= buf.len());
    let shell = ManuallyDrop::new(unsafe { buf.as_ptr().add(offset).cast::<T>().read_unaligned() });
    with(&*shell)
}
