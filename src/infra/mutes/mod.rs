pub mod in_memory;
pub mod json_store;

pub use in_memory::InMemoryMuteStore;
pub use json_store::JsonMuteStore;
