//! Heap statistics and the textual heap dump.

use std::io::{self, Write};
use std::slice;

use itertools::join;

use crate::block::BlockHeader;
use crate::constants::{align_to, HEADER_SIZE};
use crate::heap::Heap;

/// Aggregate statistics over the whole arena. `used_size` and `free_size`
/// count headers and padding and always sum to `heap_size`; `object_size`
/// counts the sizes the type descriptors declare.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HeapStats {
    pub heap_size: usize,
    pub used_size: usize,
    pub free_size: usize,
    pub num_objects: usize,
    pub num_live_objects: usize,
    pub object_size: usize,
    pub live_object_size: usize,
    pub num_free_blocks: usize,
    pub free_block_size: usize,
}

impl Heap {
    /// Walk the arena and collect statistics. With `count_live` set, the
    /// roots are marked first so live objects can be told apart; the marks
    /// are cleared again during the walk.
    pub fn collect_stats(&mut self, count_live: bool) -> HeapStats {
        let mut stats = HeapStats::default();
        stats.heap_size = self.size();

        if count_live {
            self.mark_roots();
        }

        let end = self.end();
        let mut blk = self.start();
        unsafe {
            while blk < end {
                let block = &mut *blk;
                if block.is_free() {
                    stats.num_free_blocks += 1;
                    stats.free_block_size += block.size();
                    stats.free_size += HEADER_SIZE + align_to(block.size());
                } else {
                    if block.is_marked() {
                        block.word().set_mark(false);
                        stats.num_live_objects += 1;
                        stats.live_object_size += block.type_desc().size();
                    }
                    stats.num_objects += 1;
                    stats.object_size += block.type_desc().size();
                    stats.used_size += HEADER_SIZE + align_to(block.size());
                }
                blk = block.following();
            }
        }
        debug_assert!(stats.free_size + stats.used_size == stats.heap_size);

        stats
    }

    /// Dump the contents of this heap: overall statistics, the free blocks,
    /// and every live object. Safe to call at any time outside a collection
    /// cycle; all marks are clear again when it returns.
    pub fn dump<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let stats = self.collect_stats(true);

        writeln!(out, "==== Statistics for heap at {:p} ====", self.start())?;
        writeln!(out, "Heap size:  {} bytes", stats.heap_size)?;
        writeln!(out, "Used space: {} bytes", stats.used_size)?;
        writeln!(out, "Free space: {} bytes", stats.free_size)?;
        writeln!(out)?;
        writeln!(
            out,
            "Object count:    {} ({} live)",
            stats.num_objects, stats.num_live_objects
        )?;
        writeln!(
            out,
            "Object size:     {} bytes ({} in live objects)",
            stats.object_size, stats.live_object_size
        )?;
        writeln!(
            out,
            "Available space: {} bytes in {} blocks",
            stats.free_block_size, stats.num_free_blocks
        )?;
        writeln!(out)?;

        writeln!(out, "= Free Blocks =")?;
        writeln!(out, "Address            Size(net)")?;
        unsafe {
            let mut blk = self.free_list;
            while !blk.is_null() {
                writeln!(out, "{:p} {}", blk, (*blk).size())?;
                blk = (*blk).next();
            }
        }
        writeln!(out)?;

        writeln!(out, "= Live Objects =")?;
        self.dump_live_objects(out)
    }

    /// Print each live object: address, type name, the first few payload
    /// bytes, and the value of every pointer field. Marks the roots to find
    /// the live objects and unmarks them while walking.
    fn dump_live_objects<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        const NUM_DATA_BYTES: usize = 4;

        self.mark_roots();

        let end = self.end();
        let mut blk = self.start();
        unsafe {
            while blk < end {
                let block = &mut *blk;
                if block.is_marked() {
                    block.word().set_mark(false);

                    let ty = block.type_desc();
                    let payload = block.payload();
                    writeln!(out, "{:p} {}", payload, ty.name())?;

                    let shown = ty.size().min(NUM_DATA_BYTES);
                    let bytes = slice::from_raw_parts(payload, shown);
                    let data = join(bytes.iter().map(|byte| format!("{:02x}", byte)), " ");
                    if ty.size() > NUM_DATA_BYTES {
                        writeln!(out, "  Data: {} ...", data)?;
                    } else {
                        writeln!(out, "  Data: {}", data)?;
                    }

                    if ty.offsets() > 0 {
                        writeln!(out, "  Pointers:")?;
                        for offset in ty.iter() {
                            let field = *(payload.add(offset) as *const *const u8);
                            writeln!(out, "    {:p}", field)?;
                        }
                    } else {
                        writeln!(out, "  Pointers: none")?;
                    }
                }
                blk = block.following();
            }
        }
        Ok(())
    }
}
