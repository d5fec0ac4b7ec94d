//! A managed heap over one fixed-size contiguous region, with a precise,
//! non-moving mark-and-sweep garbage collector.
//!
//! Objects are allocated from a first-fit free list of header-prefixed
//! blocks. Collection marks everything reachable from the registered roots
//! with the Deutsch-Schorr-Waite pointer-reversal algorithm - constant
//! auxiliary space, no mark stack - then rebuilds the free list in a single
//! linear sweep, destroying dead objects as it goes.

mod block;
mod constants;
mod gc;
mod heap;
mod link;
mod objectptr;
mod stats;
mod taggedptr;
mod typedesc;

pub use crate::constants::{align_to, ALIGN, HEADER_SIZE};
pub use crate::heap::{AllocError, Heap};
pub use crate::link::Link;
pub use crate::objectptr::ObjectPtr;
pub use crate::stats::HeapStats;
pub use crate::taggedptr::TaggedPtr;
pub use crate::typedesc::{DestroyFn, Managed, TypeDescriptor};
