use std::sync::{Arc, RwLock};

/// A mutable slot pointing at a host UI element.
///
/// The host may swap the element behind the slot at any time (remounts), so
/// holders re-read `current()` on every use instead of caching the element.
pub struct ElementRef<T: ?Sized> {
    current: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> ElementRef<T> {
    pub fn new(element: Option<Arc<T>>) -> Self {
        Self {
            current: RwLock::new(element),
        }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<Arc<T>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the element, returning the previous one.
    pub fn set(&self, element: Option<Arc<T>>) -> Option<Arc<T>> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, element)
    }
}

impl<T: ?Sized> Default for ElementRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Pointer identity of two shared trait objects, ignoring vtables.
pub fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
