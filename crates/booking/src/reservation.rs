//! Capacity reservation engine.
//!
//! The only place seat counts change. A reservation runs in three phases:
//!
//! 1. existence check over every requested lesson
//! 2. capacity pre-check over every requested lesson (fast fail only)
//! 3. one conditional atomic decrement per lesson, then the order insert
//!
//! Phase 3 is what keeps `space` from going negative under concurrent
//! requests. If any decrement loses the race, or the order insert fails,
//! the decrements already applied are compensated in reverse order before
//! the error is returned.
//!
//! Cancellation runs the other way round: the order record is deleted first,
//! and only the caller whose delete succeeded gives the seats back.

use std::collections::HashMap;
use std::time::Instant;

use store::{Datastore, Lesson, LessonId, NewOrder, Order, OrderId, SpaceUpdate};

use crate::validation::ValidatedBooking;
use crate::{BookingError, Result};

/// Reserves and releases lesson seats.
#[derive(Clone)]
pub struct ReservationEngine<S: Datastore> {
    store: S,
}

impl<S: Datastore> ReservationEngine<S> {
    /// Creates a new engine over the given datastore.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves `booking.seats` on every lesson in `booking.lesson_ids` and
    /// records the order. Either every lesson is decremented and the order
    /// exists, or nothing changed.
    #[tracing::instrument(
        skip(self, booking),
        fields(lessons = booking.lesson_ids.len(), seats = booking.seats)
    )]
    pub async fn reserve(&self, booking: &ValidatedBooking) -> Result<Order> {
        let started = Instant::now();
        let result = self.try_reserve(booking).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(BookingError::InsufficientCapacity { .. }) => "insufficient_capacity",
            Err(BookingError::LessonNotFound(_)) => "lesson_not_found",
            Err(BookingError::Inconsistency { .. }) => "inconsistent",
            Err(_) => "error",
        };
        metrics::counter!("reservations_total", "outcome" => outcome).increment(1);
        metrics::histogram!("reservation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        result
    }

    async fn try_reserve(&self, booking: &ValidatedBooking) -> Result<Order> {
        let seats = booking.seats;

        // Phase 1: every lesson must exist.
        let lessons: HashMap<LessonId, Lesson> = self
            .store
            .get_lessons(&booking.lesson_ids)
            .await?
            .into_iter()
            .map(|lesson| (lesson.id, lesson))
            .collect();

        if let Some(missing) = booking.lesson_ids.iter().find(|id| !lessons.contains_key(*id)) {
            return Err(BookingError::LessonNotFound(*missing));
        }

        // Phase 2: every lesson must have room for all of its occurrences.
        for (lesson_id, required) in demand_per_lesson(&booking.lesson_ids, seats) {
            let lesson = &lessons[&lesson_id];
            if u64::from(lesson.space) < required {
                return Err(BookingError::InsufficientCapacity {
                    lesson_id,
                    topic: lesson.topic.clone(),
                    requested: required,
                    available: lesson.space,
                });
            }
        }

        // Phase 3: conditional decrements, compensated on any failure.
        let mut applied: Vec<LessonId> = Vec::with_capacity(booking.lesson_ids.len());
        for &lesson_id in &booking.lesson_ids {
            let update = match self.store.try_decrement_space(lesson_id, seats).await {
                Ok(update) => update,
                Err(e) => return Err(self.roll_back(&applied, seats, e.into()).await),
            };

            match update {
                SpaceUpdate::Applied(_) => applied.push(lesson_id),
                SpaceUpdate::Insufficient { available } => {
                    tracing::warn!(
                        %lesson_id,
                        available,
                        "capacity taken by a concurrent reservation"
                    );
                    let cause = BookingError::InsufficientCapacity {
                        lesson_id,
                        topic: lessons[&lesson_id].topic.clone(),
                        requested: u64::from(seats),
                        available,
                    };
                    return Err(self.roll_back(&applied, seats, cause).await);
                }
                SpaceUpdate::Missing => {
                    let cause = BookingError::LessonNotFound(lesson_id);
                    return Err(self.roll_back(&applied, seats, cause).await);
                }
            }
        }

        let new_order = NewOrder {
            name: booking.name.clone(),
            phone_number: booking.phone_number.clone(),
            lesson_ids: booking.lesson_ids.clone(),
            number_of_space: seats,
        };
        match self.store.insert_order(new_order).await {
            Ok(order) => {
                tracing::info!(order_id = %order.id, "reservation recorded");
                Ok(order)
            }
            Err(e) => Err(self.roll_back(&applied, seats, e.into()).await),
        }
    }

    /// Gives back the seats already taken for a failed reservation.
    ///
    /// Returns `cause` if every lesson was restored, otherwise an
    /// [`BookingError::Inconsistency`] naming the lessons left short.
    async fn roll_back(&self, applied: &[LessonId], seats: u32, cause: BookingError) -> BookingError {
        if applied.is_empty() {
            return cause;
        }
        metrics::counter!("reservation_rollbacks_total").increment(1);

        let mut unrestored = Vec::new();
        for &lesson_id in applied.iter().rev() {
            match self.store.increment_space(lesson_id, seats).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(%lesson_id, "lesson vanished during rollback");
                }
                Err(e) => {
                    tracing::error!(%lesson_id, error = %e, "rollback increment failed");
                    unrestored.push(lesson_id);
                }
            }
        }

        if unrestored.is_empty() {
            tracing::info!(lessons = applied.len(), "reservation rolled back");
            return cause;
        }

        BookingError::Inconsistency {
            operation: "reserve",
            order_id: None,
            lessons: unrestored,
            detail: format!("rollback incomplete after failure: {cause}"),
        }
    }

    /// Cancels an order: deletes the order record, then restores its seats
    /// on every referenced lesson exactly once.
    ///
    /// The delete is the claim. Only the caller whose delete removed the
    /// order restores seats, so concurrent cancellations of the same order
    /// never hand back seats twice; the others get
    /// [`BookingError::OrderNotFound`] with no seat change. Lessons that no
    /// longer exist are skipped without aborting the others.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order> {
        let result = self.try_cancel(order_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(BookingError::OrderNotFound(_)) => "order_not_found",
            Err(BookingError::Inconsistency { .. }) => "inconsistent",
            Err(_) => "error",
        };
        metrics::counter!("cancellations_total", "outcome" => outcome).increment(1);

        result
    }

    async fn try_cancel(&self, order_id: OrderId) -> Result<Order> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(BookingError::OrderNotFound(order_id))?;

        if !self.store.delete_order(order_id).await? {
            tracing::debug!("order already claimed by a concurrent cancellation");
            return Err(BookingError::OrderNotFound(order_id));
        }

        let seats = order.number_of_space;
        let mut restored = 0usize;
        let mut unrestored = Vec::new();
        for &lesson_id in &order.lesson_ids {
            match self.store.increment_space(lesson_id, seats).await {
                Ok(Some(_)) => restored += 1,
                Ok(None) => {
                    tracing::warn!(%lesson_id, "referenced lesson no longer exists; skipping");
                }
                Err(e) => {
                    tracing::error!(%lesson_id, error = %e, "seat restoration failed");
                    unrestored.push(lesson_id);
                }
            }
        }

        if !unrestored.is_empty() {
            return Err(BookingError::Inconsistency {
                operation: "cancel",
                order_id: Some(order_id),
                lessons: unrestored,
                detail: format!("order deleted but {seats} seat(s) could not be restored"),
            });
        }

        tracing::info!(lessons = restored, "order cancelled");
        Ok(order)
    }
}

/// Total seats needed per distinct lesson, in first-appearance order.
fn demand_per_lesson(lesson_ids: &[LessonId], seats: u32) -> Vec<(LessonId, u64)> {
    let mut demand: Vec<(LessonId, u64)> = Vec::new();
    for &id in lesson_ids {
        match demand.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, total)) => *total += u64::from(seats),
            None => demand.push((id, u64::from(seats))),
        }
    }
    demand
}
