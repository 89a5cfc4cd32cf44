//! # mc_durable - MindCare Durable Storage
//!
//! 持久化协作者：咨询会话、消息与评估报告的存储抽象，
//! 提供内存实现 (CLI / 测试) 与 SQLite 实现 (服务进程)。

pub mod memory;
pub mod record;
pub mod sqlite;
pub mod store;

pub use memory::MemorySessionStore;
pub use record::{MessageRecord, MessageRole, SessionRecord};
pub use sqlite::{SqliteSessionStore, StoreConfig};
pub use store::SessionStore;
