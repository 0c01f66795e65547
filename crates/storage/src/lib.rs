pub mod db;
pub mod session;

pub use db::SqliteSessionStore;
pub use session::{MemorySessionStore, SessionStore, StorageError};
