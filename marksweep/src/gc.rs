//! Collection: Deutsch-Schorr-Waite marking and the sweep pass.
//!
//! Marking needs no stack and no queue. The way back through the object
//! graph is stored in the graph itself by reversing the pointer field
//! currently being followed, and each block's header word doubles as the
//! cursor over its descriptor's offset list. Every edge is traversed at most
//! twice (once reversing, once restoring), so marking runs in constant
//! auxiliary space regardless of graph shape - a hard guarantee on a
//! fixed-size arena.

use std::ptr;

use crate::block::BlockHeader;
use crate::constants::HEADER_SIZE;
use crate::heap::Heap;
use crate::typedesc::TypeDescriptor;

impl Heap {
    /// Collect garbage: mark everything reachable from the registered
    /// roots, then sweep the arena, destroying every unreachable object and
    /// rebuilding the free list. Runs to completion; all marks are clear on
    /// return.
    pub fn gc(&mut self) {
        self.mark_roots();
        self.sweep();
    }

    /// Mark each root's object graph, skipping roots already reached
    /// through an earlier root.
    pub(crate) fn mark_roots(&mut self) {
        for index in 0..self.roots.len() {
            let root = self.roots[index];
            unsafe {
                if !(*BlockHeader::from_payload(root)).is_marked() {
                    mark(root);
                }
            }
        }
    }

    /// Rebuild the free list in one linear walk, destroying garbage objects.
    ///
    /// Marked blocks survive with their mark cleared. Each maximal run of
    /// unmarked blocks collapses into a single free block; dead objects in
    /// the run are destroyed in arena order, exactly once each.
    pub(crate) fn sweep(&mut self) {
        let end = self.end();
        let mut free_list: *mut BlockHeader = ptr::null_mut();
        let mut blk = self.start();
        unsafe {
            while blk < end {
                if (*blk).is_marked() {
                    (*blk).word().set_mark(false);
                    blk = (*blk).following();
                    continue;
                }

                // Extend one free block over the whole unreachable run,
                // destroying garbage objects as they are passed
                let mut run = blk;
                loop {
                    if (*run).is_used() {
                        let ty = (*run).type_desc();
                        ty.destroy((*run).payload());
                    }
                    run = (*run).following();
                    if run >= end || (*run).is_marked() {
                        break;
                    }
                }

                let size = run as usize - blk as usize - HEADER_SIZE;
                (*blk).make_free(free_list, size);
                free_list = blk;
                blk = run;
            }
        }
        self.free_list = free_list;
    }
}

/// Mark the object graph of `root` using the Deutsch-Schorr-Waite
/// pointer-reversal algorithm.
///
/// On a block's first visit its header word is overwritten with a cursor to
/// the first cell of its descriptor's offset list and the mark bit is set;
/// the descriptor pointer is recovered later from the list's sentinel. Each
/// revisit advances the cursor one cell. A non-negative cell is the offset
/// of the next pointer field to follow; following it swaps the path's back
/// pointer into the field. The negative sentinel means the block is fully
/// scanned: the header word is restored and the traversal retreats,
/// un-reversing the parent's field.
///
/// # Safety
///
/// `root` must be an unmarked payload pointer in this arena, and every
/// pointer field reachable from it must be null or point at a payload in
/// the same arena.
pub(crate) unsafe fn mark(root: *mut u8) {
    debug_assert!(!root.is_null());
    debug_assert!(!(*BlockHeader::from_payload(root)).is_marked());

    let mut cur = root;
    let mut prev: *mut u8 = ptr::null_mut();
    loop {
        let block = &mut *BlockHeader::from_payload(cur);
        if !block.is_marked() {
            // First visit: turn the header word into an offset-list cursor
            let begin = block.type_desc().begin();
            block.word().set_ptr(begin);
            block.word().set_mark(true);
        } else {
            let cursor = block.word().ptr::<isize>();
            block.word().set_ptr(cursor.add(1));
        }

        let cursor = block.word().ptr::<isize>() as *const isize;
        let offset = *cursor;
        if offset >= 0 {
            // Advance: follow the pointer field at `offset`, reversing the
            // link so the way back lives in the field itself
            let field = cur.add(offset as usize) as *mut *mut u8;
            let target = *field;
            if !target.is_null() && !(*BlockHeader::from_payload(target)).is_marked() {
                *field = prev;
                prev = cur;
                cur = target;
            }
        } else {
            // Retreat: the cursor sits on the sentinel. Restore the header
            // word to the descriptor, keeping the mark.
            block.word().set_ptr(TypeDescriptor::from_sentinel(cursor));
            if prev.is_null() {
                return;
            }
            let finished = cur;
            cur = prev;
            let parent = &mut *BlockHeader::from_payload(cur);
            let offset = *parent.word().ptr::<isize>();
            let field = cur.add(offset as usize) as *mut *mut u8;
            prev = *field;
            *field = finished;
        }
    }
}
