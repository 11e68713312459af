use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Datastore, Lesson, LessonId, LessonPatch, LessonSearch, LessonStore, NewLesson, NewOrder,
    Order, OrderId, OrderStore, Result, SpaceUpdate, StoreError,
};

/// Injected failures, used by tests to exercise rollback and
/// inconsistency paths.
#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    fail_order_inserts: bool,
    fail_order_deletes: bool,
    fail_increments: bool,
    /// Seats taken from a lesson right before its next conditional decrement,
    /// as if a competing request had won the race.
    steal_before_decrement: HashMap<LessonId, u32>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    lessons: HashMap<LessonId, Lesson>,
    /// Kept in insertion order.
    orders: Vec<Order>,
    faults: Faults,
}

impl InMemoryState {
    fn check_available(&self) -> Result<()> {
        if self.faults.unavailable {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory datastore.
///
/// All state sits behind one lock, so every conditional decrement is
/// atomic with respect to concurrent requests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Removes a lesson out of band, leaving orders that reference it intact.
    pub async fn remove_lesson(&self, id: LessonId) -> bool {
        self.state.write().await.lessons.remove(&id).is_some()
    }

    /// Makes every operation fail with [`StoreError::Unavailable`].
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.faults.unavailable = unavailable;
    }

    /// Makes order inserts fail.
    pub async fn set_fail_order_inserts(&self, fail: bool) {
        self.state.write().await.faults.fail_order_inserts = fail;
    }

    /// Makes order deletes fail.
    pub async fn set_fail_order_deletes(&self, fail: bool) {
        self.state.write().await.faults.fail_order_deletes = fail;
    }

    /// Makes seat increments fail.
    pub async fn set_fail_increments(&self, fail: bool) {
        self.state.write().await.faults.fail_increments = fail;
    }

    /// Removes `seats` from a lesson immediately before its next conditional
    /// decrement, simulating a competing reservation that lands between a
    /// caller's capacity check and its write.
    pub async fn steal_seats_before_next_decrement(&self, id: LessonId, seats: u32) {
        self.state
            .write()
            .await
            .faults
            .steal_before_decrement
            .insert(id, seats);
    }
}

fn sorted_by_topic(mut lessons: Vec<Lesson>) -> Vec<Lesson> {
    lessons.sort_by(|a, b| a.topic.cmp(&b.topic).then(a.id.cmp(&b.id)));
    lessons
}

#[async_trait]
impl LessonStore for InMemoryStore {
    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let now = Utc::now();
        let lesson = Lesson {
            id: LessonId::new(),
            topic: lesson.topic,
            location: lesson.location,
            price: lesson.price,
            space: lesson.space,
            icon: lesson.icon,
            created_at: now,
            updated_at: now,
        };
        state.lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.lessons.get(&id).cloned())
    }

    async fn get_lessons(&self, ids: &[LessonId]) -> Result<Vec<Lesson>> {
        let state = self.state.read().await;
        state.check_available()?;
        let unique: HashSet<&LessonId> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| state.lessons.get(id).cloned())
            .collect())
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(sorted_by_topic(state.lessons.values().cloned().collect()))
    }

    async fn search_lessons(&self, search: &LessonSearch) -> Result<Vec<Lesson>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(sorted_by_topic(
            state
                .lessons
                .values()
                .filter(|l| search.matches(l))
                .cloned()
                .collect(),
        ))
    }

    async fn count_lessons(&self) -> Result<usize> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.lessons.len())
    }

    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> Result<Option<Lesson>> {
        let mut state = self.state.write().await;
        state.check_available()?;
        Ok(state.lessons.get_mut(&id).map(|lesson| {
            patch.apply_to(lesson, Utc::now());
            lesson.clone()
        }))
    }

    async fn try_decrement_space(&self, id: LessonId, seats: u32) -> Result<SpaceUpdate> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let stolen = state.faults.steal_before_decrement.remove(&id);
        let Some(lesson) = state.lessons.get_mut(&id) else {
            return Ok(SpaceUpdate::Missing);
        };
        if let Some(stolen) = stolen {
            lesson.space = lesson.space.saturating_sub(stolen);
        }

        if lesson.space < seats {
            return Ok(SpaceUpdate::Insufficient {
                available: lesson.space,
            });
        }
        lesson.space -= seats;
        lesson.updated_at = Utc::now();
        Ok(SpaceUpdate::Applied(lesson.clone()))
    }

    async fn increment_space(&self, id: LessonId, seats: u32) -> Result<Option<Lesson>> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.faults.fail_increments {
            return Err(StoreError::Unavailable(format!(
                "injected failure incrementing lesson {id}"
            )));
        }

        let Some(lesson) = state.lessons.get_mut(&id) else {
            return Ok(None);
        };
        // Same ceiling as the Postgres INTEGER column.
        lesson.space = lesson
            .space
            .checked_add(seats)
            .filter(|space| i32::try_from(*space).is_ok())
            .ok_or(StoreError::SpaceOverflow(id))?;
        lesson.updated_at = Utc::now();
        Ok(Some(lesson.clone()))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.faults.fail_order_inserts {
            return Err(StoreError::Unavailable(
                "injected failure inserting order".to_string(),
            ));
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            name: order.name,
            phone_number: order.phone_number,
            lesson_ids: order.lesson_ids,
            number_of_space: order.number_of_space,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        state.check_available()?;
        Ok(state.orders.iter().rev().cloned().collect())
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut state = self.state.write().await;
        state.check_available()?;
        if state.faults.fail_order_deletes {
            return Err(StoreError::Unavailable(format!(
                "injected failure deleting order {id}"
            )));
        }

        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        Ok(state.orders.len() != before)
    }
}

#[async_trait]
impl Datastore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        self.state.read().await.check_available()
    }
}
