//! Instance storage
//!
//! An instance is a flat byte buffer of exactly its shape's footprint, with
//! no per-instance type information; every read and write goes through the
//! shape's slot table, which pairs the property id with a kind and a byte
//! offset. The holder of the `Instance` value owns it outright, and dropping
//! it tears the slots down in declaration order.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::class::def::ClassDefinition;
use crate::logic::LogicVector;
use crate::object::ObjectRef;

/// One allocated object of a class shape.
pub struct Instance {
    shape: Arc<ClassDefinition>,
    buf: Box<[u8]>,
}

impl Instance {
    pub(crate) fn new(shape: Arc<ClassDefinition>) -> Self {
        let mut buf = vec![0u8; shape.instance_size()].into_boxed_slice();
        for slot in shape.properties() {
            slot.kind().construct(&mut buf, slot.offset());
        }
        trace!(
            target: "vsim::class::instance",
            class = %shape.name(),
            bytes = buf.len(),
            "instance constructed"
        );
        Self { shape, buf }
    }

    /// The frozen shape this instance was built from.
    #[inline]
    pub fn shape(&self) -> &Arc<ClassDefinition> {
        &self.shape
    }

    /// Store a four-state vector into integer property `pid`. Every digit
    /// must be 0 or 1.
    pub fn set_vec4(&mut self, pid: usize, val: &LogicVector) {
        let slot = self.shape.slot(pid);
        slot.kind().set_vec4(&mut self.buf, slot.offset(), val);
    }

    /// Read integer property `pid` as a vector of its full declared width.
    pub fn get_vec4(&self, pid: usize) -> LogicVector {
        let slot = self.shape.slot(pid);
        slot.kind().get_vec4(&self.buf, slot.offset())
    }

    pub fn set_real(&mut self, pid: usize, val: f64) {
        let slot = self.shape.slot(pid);
        slot.kind().set_real(&mut self.buf, slot.offset(), val);
    }

    pub fn get_real(&self, pid: usize) -> f64 {
        let slot = self.shape.slot(pid);
        slot.kind().get_real(&self.buf, slot.offset())
    }

    pub fn set_str(&mut self, pid: usize, val: &str) {
        let slot = self.shape.slot(pid);
        slot.kind().set_str(&mut self.buf, slot.offset(), val);
    }

    pub fn get_str(&self, pid: usize) -> String {
        let slot = self.shape.slot(pid);
        slot.kind().get_str(&self.buf, slot.offset())
    }

    pub fn set_object(&mut self, pid: usize, val: &ObjectRef) {
        let slot = self.shape.slot(pid);
        slot.kind().set_object(&mut self.buf, slot.offset(), val);
    }

    pub fn get_object(&self, pid: usize) -> ObjectRef {
        let slot = self.shape.slot(pid);
        slot.kind().get_object(&self.buf, slot.offset())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        for slot in self.shape.properties() {
            slot.kind().destruct(&mut self.buf, slot.offset());
        }
        trace!(
            target: "vsim::class::instance",
            class = %self.shape.name(),
            "instance destructed"
        );
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.shape.name())
            .field("bytes", &self.buf.len())
            .finish()
    }
}
