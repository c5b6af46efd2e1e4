//! The process-wide Type Descriptor Cache.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use mop_ir::Name;
use mop_types::{ClassId, ClassLoader, ClassRef, LoaderId};

use super::TypeDescriptor;
use crate::errors::target_unloaded;
use crate::DispatchResult;

/// Descriptors of the classes defined by one loader.
#[derive(Default)]
struct LoaderSlot {
    descriptors: DashMap<ClassId, Arc<TypeDescriptor>, FxBuildHasher>,
}

type Slots = DashMap<LoaderId, Arc<LoaderSlot>, FxBuildHasher>;

/// Descriptors keyed by (loader, class).
///
/// Holds no strong reference to any loader. The first descriptor created for
/// a loader registers an unload listener that drops the loader's whole slot,
/// so the descriptors and candidates of an unloaded loader are reclaimed.
pub struct DescriptorCache {
    slots: Arc<Slots>,
    object: ClassRef,
    init: Name,
}

impl DescriptorCache {
    /// `object` is the root class that interfaces implicitly extend;
    /// `init` the interned constructor name.
    pub fn new(object: &ClassRef, init: Name) -> Self {
        Self {
            slots: Arc::new(Slots::default()),
            object: ClassRef::clone(object),
            init,
        }
    }

    /// The descriptor of `class`, created on first use.
    ///
    /// Returns the same instance for as long as the class's loader lives.
    /// Fails with `TargetUnloaded` once the loader is gone.
    #[tracing::instrument(level = "trace", skip_all, fields(class = class.name()))]
    pub fn get(&self, class: &ClassRef) -> DispatchResult<Arc<TypeDescriptor>> {
        // Declared first so it is dropped last: if this is the final handle,
        // the unload listener must not run while a map guard is held.
        let loader = class.loader().ok_or_else(|| target_unloaded(class))?;
        let slot = self.slot(&loader);
        if let Some(found) = slot.descriptors.get(&class.id()) {
            return Ok(Arc::clone(&found));
        }

        let mut parents = class
            .supertypes()
            .map(|parent| self.get(parent))
            .collect::<DispatchResult<Vec<_>>>()?;
        if class.is_interface() {
            parents.push(self.get(&self.object)?);
        }
        let fresh = Arc::new(TypeDescriptor::new(class, parents, self.init));
        let descriptor = Arc::clone(&*slot.descriptors.entry(class.id()).or_insert(fresh));
        Ok(descriptor)
    }

    /// The descriptor of `class` if one has been created and not pruned.
    pub fn peek(&self, class: &ClassRef) -> Option<Arc<TypeDescriptor>> {
        let slot = self.slots.get(&class.loader_id()).map(|s| Arc::clone(&s))?;
        let descriptor = slot.descriptors.get(&class.id())?;
        Some(Arc::clone(&descriptor))
    }

    fn slot(&self, loader: &ClassLoader) -> Arc<LoaderSlot> {
        let id = loader.id();
        if let Some(slot) = self.slots.get(&id) {
            return Arc::clone(&slot);
        }
        let mut created = false;
        let slot = Arc::clone(&*self.slots.entry(id).or_insert_with(|| {
            created = true;
            Arc::new(LoaderSlot::default())
        }));
        if created {
            let slots = Arc::downgrade(&self.slots);
            let name = loader.name().to_owned();
            loader.on_unload(move |unloaded| {
                if let Some(slots) = slots.upgrade() {
                    let pruned = slots
                        .remove(&unloaded)
                        .map_or(0, |(_, slot)| slot.descriptors.len());
                    debug!(loader = name.as_str(), pruned, "loader unloaded, descriptors pruned");
                }
            });
        }
        slot
    }

    /// Number of loaders with a live slot.
    pub fn loader_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live descriptors across all loaders.
    pub fn descriptor_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.descriptors.len()).sum()
    }
}
