pub mod db;
pub mod event_bus;
pub mod memory_store;
pub mod snapshot_writer;

pub use db::DbAdapter;
pub use event_bus::EventBus;
pub use memory_store::MemorySnapshotStore;
pub use snapshot_writer::SnapshotWriter;
