//! Class shapes
//!
//! A class is declared through a [`ClassBuilder`], which collects named,
//! typed property slots, and frozen into a [`ClassDefinition`] exactly once.
//! Freezing runs the layout pass that assigns every slot a byte offset and
//! fixes the total instance footprint; a frozen shape never changes again
//! and is shared by reference for the rest of the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::class::instance::Instance;
use crate::class::property::PropertyKind;

/// One named, typed, laid-out property of a frozen class shape.
#[derive(Debug, Clone)]
pub struct PropertySlot {
    name: String,
    kind: PropertyKind,
    offset: usize,
}

impl PropertySlot {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Byte offset of this property inside an instance buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Default)]
struct SlotDecl {
    name: String,
    kind: Option<PropertyKind>,
}

/// A class shape under construction.
///
/// The builder is consumed by [`ClassBuilder::freeze`], so a shape can never
/// be frozen twice or amended afterwards.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    slots: Vec<SlotDecl>,
}

impl ClassBuilder {
    /// Open a build for class `name` with `nprops` property slots.
    pub fn begin(name: impl Into<String>, nprops: usize) -> Self {
        Self {
            name: name.into(),
            slots: (0..nprops).map(|_| SlotDecl::default()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_count(&self) -> usize {
        self.slots.len()
    }

    /// Declare (or re-declare) slot `idx`. An unrecognized kind tag leaves
    /// the slot unresolved; freeze reports it.
    pub fn declare(&mut self, idx: usize, name: impl Into<String>, tag: &str) -> Result<()> {
        let nslots = self.slots.len();
        let Some(slot) = self.slots.get_mut(idx) else {
            bail!(
                "class '{}': property index {} out of range ({} slots)",
                self.name,
                idx,
                nslots
            );
        };
        slot.name = name.into();
        slot.kind = PropertyKind::from_tag(tag);
        Ok(())
    }

    /// Lay the declared slots out and lock the shape.
    ///
    /// Slot ids are bucketed by exact byte size and offsets handed out to
    /// the largest bucket first, declaration order within a bucket, packed
    /// back to back from offset zero. Large slots land first so they tend
    /// to sit naturally aligned without spending any padding bytes; a small
    /// slot behind an odd-sized one may still land unaligned, which is why
    /// instance access never assumes alignment. The instance footprint is
    /// the plain sum of the slot sizes.
    pub fn freeze(self) -> Result<ClassDefinition> {
        let ClassBuilder { name, slots } = self;

        let mut resolved = Vec::with_capacity(slots.len());
        for (idx, decl) in slots.into_iter().enumerate() {
            let Some(kind) = decl.kind else {
                bail!("class '{}': property {} ('{}') has no resolved kind", name, idx, decl.name);
            };
            resolved.push((decl.name, kind));
        }

        let mut size_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut instance_size = 0usize;
        for (pid, (_, kind)) in resolved.iter().enumerate() {
            let size = kind.size();
            instance_size += size;
            size_map.entry(size).or_default().push(pid);
        }

        let mut offsets = vec![0usize; resolved.len()];
        let mut accum = 0usize;
        for (&size, pids) in size_map.iter().rev() {
            for &pid in pids {
                offsets[pid] = accum;
                accum += size;
            }
        }
        debug_assert_eq!(accum, instance_size);

        let slots: Vec<PropertySlot> = resolved
            .into_iter()
            .zip(offsets)
            .map(|((name, kind), offset)| PropertySlot { name, kind, offset })
            .collect();

        debug!(
            target: "vsim::class::layout",
            class = %name,
            properties = slots.len(),
            instance_size,
            "class shape frozen"
        );

        Ok(ClassDefinition {
            name,
            slots,
            instance_size,
        })
    }
}

/// A frozen class shape: the per-property layout table and the total
/// instance footprint. Instances hold their shape by `Arc`, so a definition
/// outlives every instance built from it.
#[derive(Debug)]
pub struct ClassDefinition {
    name: String,
    slots: Vec<PropertySlot>,
    instance_size: usize,
}

impl ClassDefinition {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes a single instance of this class occupies.
    #[inline]
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    #[inline]
    pub fn property_count(&self) -> usize {
        self.slots.len()
    }

    /// The slot table in declaration order (index = property id).
    #[inline]
    pub fn properties(&self) -> &[PropertySlot] {
        &self.slots
    }

    /// Resolve a property name to its id.
    pub fn property_id(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    /// Slot for `pid`. A pid past the table is a hard fault: it can only
    /// come from a miscompiled program.
    pub(crate) fn slot(&self, pid: usize) -> &PropertySlot {
        match self.slots.get(pid) {
            Some(slot) => slot,
            None => panic!(
                "class '{}': property id {} out of range ({} properties)",
                self.name,
                pid,
                self.slots.len()
            ),
        }
    }

    /// Allocate and construct a fresh instance of this shape.
    pub fn instantiate(self: &Arc<Self>) -> Instance {
        Instance::new(Arc::clone(self))
    }
}

impl fmt::Display for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "class {} ({} bytes)", self.name, self.instance_size)?;
        for (pid, slot) in self.slots.iter().enumerate() {
            writeln!(f, "  [{}] {} : {} @ {}", pid, slot.name, slot.kind, slot.offset)?;
        }
        Ok(())
    }
}
