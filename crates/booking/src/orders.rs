//! Order service providing the API used by request handlers.

use std::collections::HashMap;

use store::{Datastore, Lesson, LessonId, Order, OrderId};

use crate::reservation::ReservationEngine;
use crate::validation::BookingRequest;
use crate::{BookingError, Result};

/// An order joined with the current state of the lessons it references.
///
/// Lessons are resolved at read time, so they reflect today's topic, price
/// and space rather than a snapshot from when the order was placed. Lessons
/// that no longer exist are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithLessons {
    pub order: Order,
    pub lessons: Vec<Lesson>,
}

/// Service for placing, cancelling and reading orders.
#[derive(Clone)]
pub struct OrderService<S: Datastore> {
    store: S,
    engine: ReservationEngine<S>,
}

impl<S: Datastore> OrderService<S> {
    /// Creates a new order service with the given datastore.
    pub fn new(store: S) -> Self {
        Self {
            engine: ReservationEngine::new(store.clone()),
            store,
        }
    }

    /// Returns a reference to the underlying reservation engine.
    pub fn engine(&self) -> &ReservationEngine<S> {
        &self.engine
    }

    /// Validates a booking request and reserves its seats.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(&self, request: BookingRequest) -> Result<Order> {
        let booking = request.validated()?;
        self.engine.reserve(&booking).await
    }

    /// Cancels an order by its client-supplied id.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: &str) -> Result<Order> {
        let id = OrderId::parse(id)?;
        self.engine.cancel(id).await
    }

    /// Loads one order with its lessons.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: &str) -> Result<OrderWithLessons> {
        let id = OrderId::parse(id)?;
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(BookingError::OrderNotFound(id))?;
        let mut joined = self.join_lessons(vec![order]).await?;
        joined.pop().ok_or(BookingError::OrderNotFound(id))
    }

    /// Lists all orders, newest first, each with its lessons.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderWithLessons>> {
        let orders = self.store.list_orders().await?;
        self.join_lessons(orders).await
    }

    async fn join_lessons(&self, orders: Vec<Order>) -> Result<Vec<OrderWithLessons>> {
        let mut ids: Vec<LessonId> = orders
            .iter()
            .flat_map(|o| o.lesson_ids.iter().copied())
            .collect();
        ids.sort();
        ids.dedup();

        let lessons: HashMap<LessonId, Lesson> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .get_lessons(&ids)
                .await?
                .into_iter()
                .map(|lesson| (lesson.id, lesson))
                .collect()
        };

        Ok(orders
            .into_iter()
            .map(|order| {
                let lessons = order
                    .lesson_ids
                    .iter()
                    .filter_map(|id| lessons.get(id).cloned())
                    .collect();
                OrderWithLessons { order, lessons }
            })
            .collect())
    }
}
