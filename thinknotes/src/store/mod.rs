mod memory;
mod session;
mod sqlite;
mod storage;

pub use memory::MemoryStorage;
pub use session::{Session, UserBadge, keys};
pub use sqlite::SqliteStorage;
pub use storage::SessionStorage;
