pub mod autosave;
pub mod backup;
pub mod config_io;
pub mod lock;
pub mod store;
