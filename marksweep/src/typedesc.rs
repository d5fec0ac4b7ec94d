//! Per-type records for managed objects.
//!
//! A `TypeDescriptor` carries an object size, a destructor and the byte
//! offsets of the pointer fields within the payload. Because the collector
//! temporarily replaces a block's descriptor pointer with a cursor into this
//! offset list, the list must be contiguous with the descriptor and end in a
//! sentinel from which the descriptor address can be recovered in O(1). The
//! descriptor is therefore laid out by hand as one allocation: a fixed
//! header followed by the offset cells and the sentinel. This is the one
//! place in the crate that reinterprets raw layout; its correctness rests on
//! the cells being placed directly after the header.

use std::alloc::{alloc, handle_alloc_error, Layout};
use std::any::type_name;
use std::mem::{align_of, size_of};
use std::ptr;
use std::slice;

/// Destructor callback invoked on a dead object's payload during sweep
pub type DestroyFn = unsafe fn(*mut u8);

/// The offset of the pointer-offset list from the start of a descriptor
const LIST_OFFSET: usize =
    (size_of::<TypeDescriptor>() + align_of::<isize>() - 1) & !(align_of::<isize>() - 1);

/// An immutable per-type record: object size, destructor, and the offsets of
/// the managed pointer fields within objects of the type.
///
/// The `count + 1` offset cells live directly after this header in the same
/// allocation. The final cell is the sentinel: it stores the (negative) byte
/// distance from itself back to the descriptor base, so a cursor positioned
/// on it both terminates iteration and identifies the descriptor.
///
/// Descriptors outlive every object of their type and the heap itself;
/// construction hands out `&'static` references and the backing memory is
/// intentionally never freed.
pub struct TypeDescriptor {
    name: &'static str,
    size: usize,
    destroy: DestroyFn,
    count: usize,
}

impl TypeDescriptor {
    /// Create a descriptor from its parts. Each offset must name a
    /// pointer-aligned, pointer-sized slot inside the payload.
    pub fn new(
        name: &'static str,
        size: usize,
        destroy: DestroyFn,
        offsets: &[usize],
    ) -> &'static TypeDescriptor {
        debug_assert!(size > 0, "zero-sized managed types are not supported");
        for &offset in offsets {
            debug_assert!(
                offset % size_of::<usize>() == 0,
                "pointer field offset {} is not pointer-aligned",
                offset
            );
            debug_assert!(
                offset + size_of::<usize>() <= size,
                "pointer field offset {} is outside the payload",
                offset
            );
        }

        let total = LIST_OFFSET + (offsets.len() + 1) * size_of::<isize>();
        let layout = Layout::from_size_align(total, align_of::<TypeDescriptor>()).unwrap();

        unsafe {
            let base = alloc(layout) as *mut TypeDescriptor;
            if base.is_null() {
                handle_alloc_error(layout);
            }
            ptr::write(
                base,
                TypeDescriptor {
                    name,
                    size,
                    destroy,
                    count: offsets.len(),
                },
            );

            let list = (base as *mut u8).add(LIST_OFFSET) as *mut isize;
            for (index, &offset) in offsets.iter().enumerate() {
                list.add(index).write(offset as isize);
            }

            // The sentinel encodes the way back from the end of the list to
            // the descriptor. The list follows the header, so this is
            // strictly negative and thus distinguishable from any offset.
            let end = list.add(offsets.len());
            end.write(base as isize - end as isize);

            &*base
        }
    }

    /// Create a descriptor for `T`: its `size_of`, a destructor that drops a
    /// `T` in place, and the given pointer field offsets.
    pub fn of<T>(offsets: &[usize]) -> &'static TypeDescriptor {
        TypeDescriptor::new(type_name::<T>(), size_of::<T>(), drop_payload::<T>, offsets)
    }

    /// The name of the described type, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The size in bytes of objects described by this descriptor
    pub fn size(&self) -> usize {
        self.size
    }

    /// The number of pointer field offsets
    pub fn offsets(&self) -> usize {
        self.count
    }

    /// Cursor to the first pointer field offset
    pub fn begin(&self) -> *const isize {
        unsafe { (self as *const TypeDescriptor as *const u8).add(LIST_OFFSET) as *const isize }
    }

    /// Cursor one past the last pointer field offset: the sentinel cell
    pub fn end(&self) -> *const isize {
        unsafe { self.begin().add(self.count) }
    }

    /// Iterate over the pointer field offsets
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let cells = unsafe { slice::from_raw_parts(self.begin(), self.count) };
        cells.iter().map(|&offset| offset as usize)
    }

    /// Recover a descriptor from a cursor positioned on its sentinel cell
    ///
    /// # Safety
    ///
    /// `cursor` must point at the sentinel cell of a live descriptor, i.e. a
    /// cursor obtained from `begin()` and advanced no further than `end()`.
    pub unsafe fn from_sentinel(cursor: *const isize) -> *const TypeDescriptor {
        debug_assert!(*cursor < 0);
        (cursor as *const u8).offset(*cursor) as *const TypeDescriptor
    }

    /// Destroy the object at `payload`
    ///
    /// # Safety
    ///
    /// `payload` must point at a live, initialized object of the described
    /// type, and the destructor must run at most once per object.
    pub unsafe fn destroy(&self, payload: *mut u8) {
        (self.destroy)(payload)
    }
}

/// Destructor used by `TypeDescriptor::of`: drop the payload in place as `T`
unsafe fn drop_payload<T>(payload: *mut u8) {
    ptr::drop_in_place(payload as *mut T);
}

/// The typed allocation seam: a managed type knows its own descriptor.
/// Implemented with the `managed_type!` macro.
pub trait Managed {
    fn type_desc() -> &'static TypeDescriptor;
}

/// Declare a type as managed, deriving its `TypeDescriptor` from the named
/// pointer fields:
///
/// ```ignore
/// #[repr(C)]
/// struct Node {
///     next: Link<Node>,
///     value: u64,
/// }
/// managed_type!(Node, next);
/// ```
#[macro_export]
macro_rules! managed_type {
    ($T:ty) => {
        $crate::managed_type!($T,);
    };
    ($T:ty, $($field:ident),*) => {
        impl $crate::Managed for $T {
            fn type_desc() -> &'static $crate::TypeDescriptor {
                static DESC: ::std::sync::OnceLock<&'static $crate::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                *DESC.get_or_init(|| {
                    $crate::TypeDescriptor::of::<$T>(&[$(::core::mem::offset_of!($T, $field)),*])
                })
            }
        }
    };
}
