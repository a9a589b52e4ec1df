//! Session persistence: data model, JSON-file store, errors.

pub mod errors;
pub mod store;
pub mod types;

pub use errors::StoreError;
pub use store::{now_ms, SessionStore};
pub use types::{
    Message, MessageInfo, MessagePart, RawTurn, Session, SessionChild, TodoItem, TodoPriority,
    TodoStatus,
};
