//! Opaque object handles
//!
//! Properties of kind `o` store one of these. The handle is either nil or a
//! reference-counted pointer to some payload; what the payload is and how it
//! is shared is the concern of whoever minted the handle, not of the class
//! object model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Nil-able, cheaply clonable object handle.
#[derive(Clone, Default)]
pub struct ObjectRef(Option<Arc<dyn Any>>);

impl ObjectRef {
    /// The nil handle.
    #[inline]
    pub fn nil() -> Self {
        Self(None)
    }

    /// Handle owning a fresh payload.
    pub fn new<T: Any>(payload: T) -> Self {
        Self(Some(Arc::new(payload)))
    }

    /// Handle sharing an existing payload.
    pub fn from_arc(payload: Arc<dyn Any>) -> Self {
        Self(Some(payload))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the payload as `T`, if the handle is non-nil and the payload
    /// has that type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|payload| payload.downcast_ref())
    }

    /// Pointer identity: both handles reference the same payload, or both
    /// are nil.
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(payload) => write!(f, "ObjectRef({:p})", Arc::as_ptr(payload)),
            None => f.write_str("ObjectRef(nil)"),
        }
    }
}
