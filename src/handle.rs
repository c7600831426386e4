use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Shared-ownership reference to a model object.
///
/// Copying a `Handle` shares the payload; the payload lives exactly as long
/// as its longest-living handle. Two handles compare equal iff they share
/// the identical payload, not when the payloads happen to have equal
/// values.
///
/// The payload is taken by value on construction, so two handles can never
/// be built independently over the same allocation.
pub struct Handle<T: ?Sized> {
    inner: Rc<T>,
}

impl<T> Handle<T> {
    pub fn new(payload: T) -> Self {
        Self {
            inner: Rc::new(payload),
        }
    }
}

impl<T: ?Sized> Handle<T> {
    /// Wraps an existing shared allocation. This is the explicit up-cast
    /// path: `Handle::from_rc(handle.rc() as Rc<dyn Trait>)`.
    pub fn from_rc(rc: Rc<T>) -> Self {
        Self { inner: rc }
    }

    /// A clone of the underlying shared pointer.
    pub fn rc(&self) -> Rc<T> {
        Rc::clone(&self.inner)
    }

    /// Number of handles currently sharing the payload.
    pub fn use_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Identity comparison: do the two handles share the same payload?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: ?Sized> Eq for Handle<T> {}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&&*self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity() {
        let h1 = Handle::new(42);
        let h2 = h1.clone();
        let h3 = Handle::new(42);
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn payload_outlives_clones() {
        let h1 = Handle::new(String::from("payload"));
        let h2 = h1.clone();
        assert_eq!(h1.use_count(), 2);
        drop(h1);
        assert_eq!(&*h2, "payload");
        assert_eq!(h2.use_count(), 1);
    }

    #[test]
    fn upcast_preserves_identity() {
        trait Named {
            fn name(&self) -> &str;
        }
        struct Leaf;
        impl Named for Leaf {
            fn name(&self) -> &str {
                "leaf"
            }
        }
        let concrete = Handle::new(Leaf);
        let dynamic: Handle<dyn Named> = Handle::from_rc(concrete.rc() as Rc<dyn Named>);
        assert_eq!(dynamic.name(), "leaf");
        assert_eq!(concrete.use_count(), 2);
    }
}
