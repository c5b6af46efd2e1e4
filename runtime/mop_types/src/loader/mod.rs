//! Class loaders: class ownership, delegation and unload notification.
//!
//! A loader strongly owns the classes it defines; classes point back weakly.
//! When the last [`ClassLoader`] handle is dropped, every registered unload
//! listener runs once with the loader's id. Caches keyed on the loader use
//! this to drop their entries.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::{ClassBuilder, ClassRef};

/// Process-unique loader identity, never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoaderId(u64);

static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

impl LoaderId {
    fn next() -> Self {
        LoaderId(NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loader#{}", self.0)
    }
}

/// Errors raised when defining classes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("class {class} is already defined by {loader}")]
    DuplicateClass { class: String, loader: String },
}

type UnloadListener = Box<dyn FnOnce(LoaderId) + Send>;

struct LoaderInner {
    id: LoaderId,
    name: Arc<str>,
    parent: Option<ClassLoader>,
    classes: RwLock<FxHashMap<Arc<str>, ClassRef>>,
    listeners: Mutex<Vec<UnloadListener>>,
}

impl Drop for LoaderInner {
    fn drop(&mut self) {
        let listeners = std::mem::take(self.listeners.get_mut());
        for listener in listeners {
            listener(self.id);
        }
    }
}

/// Strong handle to a class loader. The loader is unloaded when the last
/// handle (including child loaders' parent links) is dropped.
#[derive(Clone)]
pub struct ClassLoader(Arc<LoaderInner>);

impl ClassLoader {
    pub fn new(name: &str) -> Self {
        Self::create(name, None)
    }

    /// A loader that delegates class lookups to `parent` first.
    pub fn with_parent(name: &str, parent: &ClassLoader) -> Self {
        Self::create(name, Some(parent.clone()))
    }

    fn create(name: &str, parent: Option<ClassLoader>) -> Self {
        ClassLoader(Arc::new(LoaderInner {
            id: LoaderId::next(),
            name: Arc::from(name),
            parent,
            classes: RwLock::new(FxHashMap::default()),
            listeners: Mutex::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> LoaderId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&ClassLoader> {
        self.0.parent.as_ref()
    }

    /// Define a class in this loader.
    pub fn define(&self, builder: ClassBuilder) -> Result<ClassRef, LoaderError> {
        let mut classes = self.0.classes.write();
        if classes.contains_key(builder.name()) {
            return Err(LoaderError::DuplicateClass {
                class: builder.name().to_string(),
                loader: self.to_string(),
            });
        }
        let name = Arc::clone(builder.name());
        let class = ClassRef::new(builder.build(self));
        classes.insert(name, ClassRef::clone(&class));
        Ok(class)
    }

    /// Define a class whose name is known to be free in this loader.
    pub(crate) fn define_fresh(&self, builder: ClassBuilder) -> ClassRef {
        let name = Arc::clone(builder.name());
        let class = ClassRef::new(builder.build(self));
        self.0.classes.write().insert(name, ClassRef::clone(&class));
        class
    }

    /// Find a class by name, asking the parent chain first.
    pub fn find_class(&self, name: &str) -> Option<ClassRef> {
        if let Some(found) = self.parent().and_then(|p| p.find_class(name)) {
            return Some(found);
        }
        self.0.classes.read().get(name).cloned()
    }

    pub fn class_count(&self) -> usize {
        self.0.classes.read().len()
    }

    /// Run `listener` once when this loader is unloaded.
    pub fn on_unload<F>(&self, listener: F)
    where
        F: FnOnce(LoaderId) + Send + 'static,
    {
        self.0.listeners.lock().push(Box::new(listener));
    }

    pub fn downgrade(&self) -> WeakClassLoader {
        WeakClassLoader {
            id: self.0.id,
            inner: Arc::downgrade(&self.0),
        }
    }
}

impl PartialEq for ClassLoader {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ClassLoader {}

impl fmt::Display for ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.name, self.0.id)
    }
}

impl fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassLoader({self})")
    }
}

/// Weak handle to a class loader; does not keep it loaded.
#[derive(Clone)]
pub struct WeakClassLoader {
    id: LoaderId,
    inner: Weak<LoaderInner>,
}

impl WeakClassLoader {
    pub fn id(&self) -> LoaderId {
        self.id
    }

    pub fn upgrade(&self) -> Option<ClassLoader> {
        self.inner.upgrade().map(ClassLoader)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakClassLoader({}, alive={})", self.id, self.is_alive())
    }
}
