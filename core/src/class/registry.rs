//! Class registry and the compile-time registration protocol
//!
//! The loader drives three calls per class out of the compiled stream:
//! `begin_class` opens a build, `declare_property` fills slots in any order,
//! `end_class` freezes the shape and publishes it into the scope's class
//! table. A scope carries at most one open build at a time; the compiled
//! stream is trusted to close each class before opening the next, and a
//! violation is an error the host treats as fatal.

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::class::def::{ClassBuilder, ClassDefinition};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

#[derive(Debug)]
struct OpenBuild {
    label: String,
    builder: ClassBuilder,
}

/// Per-scope class table plus the single build-in-progress slot.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: FastHashMap<String, Arc<ClassDefinition>>,
    labels: FastHashMap<String, Arc<ClassDefinition>>,
    open: Option<OpenBuild>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: fast_hash_map_new(),
            labels: fast_hash_map_new(),
            open: None,
        }
    }

    /// Open a class build. Fails while another build is open in this scope.
    pub fn begin_class(&mut self, label: &str, name: &str, nprops: usize) -> Result<()> {
        if let Some(open) = &self.open {
            bail!(
                "begin_class '{}': class '{}' is still being built",
                name,
                open.builder.name()
            );
        }
        self.open = Some(OpenBuild {
            label: label.to_owned(),
            builder: ClassBuilder::begin(name, nprops),
        });
        Ok(())
    }

    /// Declare one property of the class being built.
    pub fn declare_property(&mut self, idx: usize, name: &str, tag: &str) -> Result<()> {
        let Some(open) = self.open.as_mut() else {
            bail!("declare_property '{}': no class build is open", name);
        };
        open.builder.declare(idx, name, tag)
    }

    /// Freeze the open build and publish it under its name and label.
    ///
    /// A later registration under the same name replaces the earlier entry;
    /// name uniqueness is the front end's concern, not checked here.
    pub fn end_class(&mut self) -> Result<Arc<ClassDefinition>> {
        let Some(open) = self.open.take() else {
            bail!("end_class: no class build is open");
        };
        let def = Arc::new(open.builder.freeze()?);
        debug!(
            target: "vsim::class",
            class = %def.name(),
            label = %open.label,
            instance_size = def.instance_size(),
            "class registered"
        );
        self.classes.insert(def.name().to_owned(), Arc::clone(&def));
        self.labels.insert(open.label, Arc::clone(&def));
        Ok(def)
    }

    /// Look a class up by its language-level name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<ClassDefinition>> {
        self.classes.get(name)
    }

    /// Look a class up by the compile-time label it was registered under.
    pub fn lookup_label(&self, label: &str) -> Option<&Arc<ClassDefinition>> {
        self.labels.get(label)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_builds_and_publishes_a_class() {
        let mut registry = ClassRegistry::new();
        registry.begin_class("C1", "packet", 2).expect("begin");
        registry.declare_property(0, "kind", "b8").expect("declare");
        registry.declare_property(1, "weight", "r").expect("declare");
        let def = registry.end_class().expect("end");
        assert_eq!(def.name(), "packet");
        assert_eq!(def.instance_size(), 9);
        assert!(Arc::ptr_eq(registry.lookup("packet").expect("by name"), &def));
        assert!(Arc::ptr_eq(registry.lookup_label("C1").expect("by label"), &def));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn only_one_build_may_be_open() {
        let mut registry = ClassRegistry::new();
        registry.begin_class("C1", "first", 0).expect("begin");
        let err = registry.begin_class("C2", "second", 0).expect_err("second begin must fail");
        assert!(err.to_string().contains("'first'"), "unexpected message: {err}");
        // The original build is still usable.
        registry.end_class().expect("end");
        registry.begin_class("C2", "second", 0).expect("begin after end");
    }

    #[test]
    fn declare_and_end_need_an_open_build() {
        let mut registry = ClassRegistry::new();
        assert!(registry.declare_property(0, "stray", "b8").is_err());
        assert!(registry.end_class().is_err());
    }

    #[test]
    fn unknown_tag_surfaces_at_end_class() {
        let mut registry = ClassRegistry::new();
        registry.begin_class("C1", "broken", 1).expect("begin");
        registry.declare_property(0, "field", "w12").expect("declare accepts unknown tags");
        let err = registry.end_class().expect_err("freeze must fail");
        assert!(err.to_string().contains("'field'"), "unexpected message: {err}");
        // The failed build is discarded; a new one can open.
        registry.begin_class("C1", "broken", 0).expect("begin after failed end");
    }

    #[test]
    fn same_name_registration_overwrites() {
        let mut registry = ClassRegistry::new();
        registry.begin_class("C1", "dup", 0).expect("begin");
        let first = registry.end_class().expect("end");
        registry.begin_class("C2", "dup", 1).expect("begin");
        registry.declare_property(0, "extra", "b8").expect("declare");
        let second = registry.end_class().expect("end");
        assert_eq!(registry.len(), 1);
        let current = registry.lookup("dup").expect("entry");
        assert!(!Arc::ptr_eq(current, &first));
        assert!(Arc::ptr_eq(current, &second));
        // The first shape stays alive for its label and any instances.
        assert!(Arc::ptr_eq(registry.lookup_label("C1").expect("old label"), &first));
    }
}
