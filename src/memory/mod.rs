//! Room storage and consolidation.

pub mod entry;
pub mod store;

pub use entry::{Room, RoomKind};
pub use store::{MemoryStore, ReflectOutcome, StoreConfig, StoreError};
