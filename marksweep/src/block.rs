//! In-place block layout.
//!
//! Every block in the arena starts with a [`BlockHeader`]: the usable
//! payload size and the tagged header word. The header occupies exactly one
//! alignment unit and the payload follows immediately, so the whole arena
//! can be walked linearly with `following` and no side tables.

use std::ptr;

use crate::constants::{align_to, ALIGN, HEADER_SIZE};
use crate::taggedptr::TaggedPtr;
use crate::typedesc::TypeDescriptor;

/// The fixed-size prefix of every block. A block is either free (the word
/// links to the next free block) or used (the word points at the payload's
/// `TypeDescriptor`); the distinction lives in the word's free bit.
#[repr(C)]
pub struct BlockHeader {
    size: usize,
    word: TaggedPtr,
}

// The size and the tagged word must pack into exactly one alignment unit or
// the payload would not start at HEADER_SIZE.
const _: () = assert!(std::mem::size_of::<BlockHeader>() == HEADER_SIZE);

impl BlockHeader {
    /// Initialize a new, free block of `size` usable bytes at `at`, linking
    /// `next` as its free-list successor.
    ///
    /// # Safety
    ///
    /// `at` must be aligned to [`ALIGN`] and point at `HEADER_SIZE + size`
    /// writable bytes.
    pub unsafe fn init_free(at: *mut BlockHeader, size: usize, next: *mut BlockHeader) {
        debug_assert!(size >= ALIGN);

        let mut word = TaggedPtr::new(next, false);
        word.set_free(true);
        ptr::write(at, BlockHeader { size, word });
    }

    /// The usable size of this block, not including the header
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mark this block as free and set the next block in the free list
    pub fn set_next(&mut self, next: *mut BlockHeader) {
        debug_assert!(!ptr::eq(next, self));
        self.word.set_ptr(next);
        self.word.set_free(true);
    }

    /// Mark this block as free and set both its successor and usable size
    pub fn make_free(&mut self, next: *mut BlockHeader, size: usize) {
        self.set_next(next);
        debug_assert!(size >= ALIGN);
        self.size = size;
    }

    /// The next block in the free list. This block must be free.
    pub fn next(&self) -> *mut BlockHeader {
        debug_assert!(self.is_free() && !self.is_marked());
        self.word.ptr()
    }

    /// The physically next block in the arena
    pub fn following(&self) -> *mut BlockHeader {
        unsafe { self.payload().add(align_to(self.size)) as *mut BlockHeader }
    }

    /// Mark this block as used and stamp the payload type
    pub fn set_type(&mut self, ty: &'static TypeDescriptor) {
        self.word.set_ptr(ty as *const TypeDescriptor);
        self.word.set_free(false);
    }

    /// The payload type. This block must be used and not mid-mark, since the
    /// collector transiently replaces the descriptor pointer with a cursor.
    pub fn type_desc(&self) -> &'static TypeDescriptor {
        debug_assert!(self.is_used() && !self.is_marked());
        unsafe { &*self.word.ptr::<TypeDescriptor>() }
    }

    pub fn is_free(&self) -> bool {
        self.word.free()
    }

    pub fn is_used(&self) -> bool {
        self.word.used()
    }

    pub fn is_marked(&self) -> bool {
        self.word.mark()
    }

    /// Direct access to the header word; the collector reuses it as a cursor
    pub fn word(&mut self) -> &mut TaggedPtr {
        &mut self.word
    }

    /// Pointer to the payload bytes of this block
    pub fn payload(&self) -> *mut u8 {
        unsafe { (self as *const BlockHeader as *mut u8).add(HEADER_SIZE) }
    }

    /// Header of the block owning `payload`
    ///
    /// # Safety
    ///
    /// `payload` must be a payload pointer handed out by the allocator.
    pub unsafe fn from_payload(payload: *mut u8) -> *mut BlockHeader {
        payload.sub(HEADER_SIZE) as *mut BlockHeader
    }

    /// Split this block in two if there is room. If the tail beyond an
    /// aligned `new_size` payload can hold another header plus at least
    /// [`ALIGN`] payload bytes, this block shrinks to `align_to(new_size)`
    /// and the tail becomes a new free block spliced in after it; otherwise
    /// nothing changes and the whole block is handed out. This block must be
    /// free.
    pub fn split(&mut self, new_size: usize) {
        debug_assert!(self.is_free());

        let aligned = align_to(new_size);
        let total = align_to(self.size);
        if total < aligned + HEADER_SIZE + ALIGN {
            return;
        }

        let rest_size = total - aligned - HEADER_SIZE;
        unsafe {
            let rest = self.payload().add(aligned) as *mut BlockHeader;
            BlockHeader::init_free(rest, rest_size, self.word.ptr());
            self.word.set_ptr(rest);
        }
        self.size = aligned;
    }
}
