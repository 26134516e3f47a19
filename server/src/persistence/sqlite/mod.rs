//! SQLite-backed quiz store.
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with WAL mode, foreign
//! keys, and embedded migrations, exactly as the teacher's connection setup
//! does. [`QuizStore`] is the single repository this server needs.

mod database;
mod store;

pub use database::Database;
pub use store::QuizStore;
