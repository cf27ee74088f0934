//! Disk-resident B+ tree index over a single integer attribute.
//!
//! The tree maps an `i32` key, extracted at a fixed byte offset from each
//! heap record, to the record's RID. Duplicate keys are permitted. Nodes
//! are fixed-layout pages operated on in place in buffer-manager frames:
//!
//! ```text
//! Internal page                      Leaf page
//! +------------------+ 0            +------------------+ 0
//! | level: u32       |              | key_array        |
//! +------------------+ 4            |   [i32; 682]     |
//! | key_array        |              +------------------+ 2728
//! |   [i32; 1023]    |              | rid_array        |
//! +------------------+ 4096         |   [rid; 682]     |
//! | child_array      |              +------------------+ 8184
//! |   [u32; 1024]    |              | right_sib: u32   |
//! +------------------+ 8192         +------------------+ 8188
//! ```
//!
//! Unused key slots hold `i32::MAX`; unused page-number slots hold 0. The
//! number of live keys in a node is derived from the sentinel boundary, so
//! nodes carry no explicit count field.
//!
//! Insertion is a postorder recursive descent: leaf splits copy their
//! separator up (the key stays in the new right leaf), internal splits
//! push their middle key up (the key leaves both halves), and a push-up
//! out of the root allocates a replacement root. A range scan descends to
//! the first qualifying leaf entry and then walks the sibling chain,
//! keeping exactly the current leaf pinned between calls.

mod constants;
mod index;
mod node;
mod scan;

pub use constants::{INTERNAL_FANOUT, KEY_SENTINEL, LEAF_FANOUT};
pub use index::BTreeIndex;
pub use scan::ScanOp;
