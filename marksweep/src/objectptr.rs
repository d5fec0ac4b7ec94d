use std::ptr::NonNull;

use crate::block::BlockHeader;
use crate::typedesc::TypeDescriptor;

/// A typed handle to a managed object's payload.
///
/// A handle is always non-null; null only exists inside [`Link`] fields,
/// which hand out handles for their non-null states. The handle also knows
/// the block layout: the block header sits one alignment unit before the
/// payload, so a handle can reach its own header and recover the descriptor
/// stamped there without any side table.
///
/// [`Link`]: crate::Link
pub struct ObjectPtr<T> {
    payload: NonNull<T>,
}

impl<T> ObjectPtr<T> {
    /// Wrap a payload address
    pub fn new(payload: NonNull<T>) -> ObjectPtr<T> {
        ObjectPtr { payload }
    }

    /// Wrap a bare payload pointer, `None` if it is null
    pub fn from_raw(payload: *mut T) -> Option<ObjectPtr<T>> {
        NonNull::new(payload).map(ObjectPtr::new)
    }

    /// The bare typed payload pointer
    pub fn raw(&self) -> *mut T {
        self.payload.as_ptr()
    }

    /// The payload address with the type erased, the form the heap's root
    /// and deallocation surfaces take
    pub fn untyped(&self) -> *mut u8 {
        self.payload.as_ptr() as *mut u8
    }

    /// The descriptor stamped into this object's block header.
    ///
    /// # Safety
    ///
    /// The handle must point at a live payload allocated from a heap, and
    /// no collection may be mid-mark (the header word is an offset-list
    /// cursor then, not a descriptor).
    pub unsafe fn type_desc(&self) -> &'static TypeDescriptor {
        (*BlockHeader::from_payload(self.untyped())).type_desc()
    }

    /// Borrow the payload.
    ///
    /// # Safety
    ///
    /// The handle must point at a live, initialized payload, and the borrow
    /// must not outlive the object or overlap a conflicting mutation.
    pub unsafe fn as_ref(&self) -> &T {
        &*self.payload.as_ptr()
    }
}

impl<T> Clone for ObjectPtr<T> {
    fn clone(&self) -> ObjectPtr<T> {
        ObjectPtr {
            payload: self.payload,
        }
    }
}

impl<T> Copy for ObjectPtr<T> {}

impl<T> PartialEq for ObjectPtr<T> {
    fn eq(&self, other: &ObjectPtr<T>) -> bool {
        self.payload == other.payload
    }
}
