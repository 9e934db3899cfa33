pub mod layout_store;

pub use layout_store::JsonFileLayoutStore;
