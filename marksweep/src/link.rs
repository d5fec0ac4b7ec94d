use std::cell::Cell;
use std::ptr::null_mut;

use crate::objectptr::ObjectPtr;

/// A nullable managed-pointer field inside a payload.
///
/// Managed objects store their pointers to other managed objects in `Link`
/// fields and list those fields' byte offsets in their `TypeDescriptor`.
/// The layout is exactly one pointer-sized, interiorly mutable slot
/// (`repr(transparent)` over `Cell<*mut T>`), which is what allows the
/// collector to read and rewrite the slot through a `*mut *mut u8` during
/// pointer-reversal marking.
#[repr(transparent)]
pub struct Link<T> {
    ptr: Cell<*mut T>,
}

impl<T> Link<T> {
    /// A null link
    pub fn null() -> Link<T> {
        Link {
            ptr: Cell::new(null_mut()),
        }
    }

    /// A link to the given object
    pub fn new(target: ObjectPtr<T>) -> Link<T> {
        Link {
            ptr: Cell::new(target.raw()),
        }
    }

    /// Construct directly from a bare, possibly null pointer
    pub fn from_raw(ptr: *mut T) -> Link<T> {
        Link { ptr: Cell::new(ptr) }
    }

    /// Get the target, or `None` for a null link
    pub fn get(&self) -> Option<ObjectPtr<T>> {
        ObjectPtr::from_raw(self.ptr.get())
    }

    pub fn set(&self, target: ObjectPtr<T>) {
        self.ptr.set(target.raw());
    }

    pub fn set_null(&self) {
        self.ptr.set(null_mut());
    }

    pub fn is_null(&self) -> bool {
        self.ptr.get().is_null()
    }

    /// Get the bare, possibly null pointer
    pub fn raw(&self) -> *mut T {
        self.ptr.get()
    }

    /// Set the bare, possibly null pointer
    pub fn set_raw(&self, ptr: *mut T) {
        self.ptr.set(ptr);
    }
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Link<T> {
        Link::from_raw(self.ptr.get())
    }
}

impl<T> Default for Link<T> {
    fn default() -> Link<T> {
        Link::null()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::mem::size_of;
    use std::ptr::NonNull;

    #[test]
    fn test_link_is_one_pointer_wide() {
        assert!(size_of::<Link<u64>>() == size_of::<*mut u64>());
    }

    #[test]
    fn test_null_roundtrip() {
        let link: Link<u64> = Link::null();
        assert!(link.is_null());
        assert!(link.get().is_none());

        let value: u64 = 0;
        let target = ObjectPtr::new(NonNull::from(&value));
        link.set(target);
        assert!(!link.is_null());
        assert!(link.get() == Some(target));

        link.set_null();
        assert!(link.get().is_none());
    }
}
