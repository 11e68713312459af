use async_trait::async_trait;

use crate::{
    Lesson, LessonId, LessonPatch, LessonSearch, NewLesson, NewOrder, Order, OrderId, Result,
};

/// Outcome of a conditional seat decrement.
#[derive(Debug, Clone, PartialEq)]
pub enum SpaceUpdate {
    /// The decrement was applied. Carries the lesson as it is after the write.
    Applied(Lesson),
    /// The lesson exists but had fewer than the requested seats at write time.
    Insufficient { available: u32 },
    /// No lesson with that id exists.
    Missing,
}

/// Access to the `lessons` collection.
///
/// `space` is changed only by [`try_decrement_space`](LessonStore::try_decrement_space)
/// and [`increment_space`](LessonStore::increment_space), plus explicit admin
/// updates. Implementations must make the conditional decrement a single
/// atomic operation: the `space >= n` check is re-verified at write time.
#[async_trait]
pub trait LessonStore: Send + Sync {
    /// Inserts a lesson, assigning its id and timestamps.
    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson>;

    /// Loads a lesson by id.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>>;

    /// Loads every lesson whose id is in `ids`. Missing ids are skipped and
    /// duplicates are returned once; ordering is unspecified.
    async fn get_lessons(&self, ids: &[LessonId]) -> Result<Vec<Lesson>>;

    /// Lists all lessons ordered by topic.
    async fn list_lessons(&self) -> Result<Vec<Lesson>>;

    /// Lists lessons matching a search, ordered by topic.
    async fn search_lessons(&self, search: &LessonSearch) -> Result<Vec<Lesson>>;

    /// Counts lessons.
    async fn count_lessons(&self) -> Result<usize>;

    /// Applies a partial update. Returns `None` if the lesson does not exist.
    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> Result<Option<Lesson>>;

    /// Atomically decrements `space` by `seats` only if `space >= seats`.
    async fn try_decrement_space(&self, id: LessonId, seats: u32) -> Result<SpaceUpdate>;

    /// Increments `space` by `seats`. Returns `None` if the lesson does not exist.
    async fn increment_space(&self, id: LessonId, seats: u32) -> Result<Option<Lesson>>;
}

/// Access to the `orders` collection.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order, assigning its id and timestamps.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Deletes an order. Returns false if it was already gone.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

/// A handle to both collections, constructed once by the process entry
/// point and cloned into every service that needs it.
#[async_trait]
pub trait Datastore: LessonStore + OrderStore + Clone + 'static {
    /// Checks that the datastore is reachable.
    async fn ping(&self) -> Result<()>;
}
