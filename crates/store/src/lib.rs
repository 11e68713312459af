//! Document store for lessons and orders.
//!
//! Two collections live here: `lessons`, the shared mutable resource whose
//! `space` counter is only ever changed through conditional atomic updates,
//! and `orders`, which is append/delete only. Both an in-memory backend and
//! a PostgreSQL backend implement the same traits.

pub mod error;
pub mod lesson;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{LessonId, OrderId};
pub use error::{Result, StoreError};
pub use lesson::{Lesson, LessonPatch, MAX_SPACE, NewLesson};
pub use memory::InMemoryStore;
pub use order::{NewOrder, Order};
pub use postgres::PostgresStore;
pub use query::LessonSearch;
pub use store::{Datastore, LessonStore, OrderStore, SpaceUpdate};
