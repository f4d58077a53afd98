pub mod container;
pub mod refs;
pub mod store;

pub use container::{concat, Container, CorruptLine, Keyed};
pub use refs::{
    delete_ref, is_ancestor, list_refs, point_ref, read_ref, write_ref, write_ref_with_parents,
    RefSnapshot, ANCHOR_OBJECT,
};
pub use store::RecordStore;
