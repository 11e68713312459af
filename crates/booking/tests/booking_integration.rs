//! Integration tests for reservation, cancellation and order reads.

use booking::{BookingError, BookingRequest, LessonService, OrderService, catalog};
use store::{InMemoryStore, LessonId, LessonStore, NewLesson, OrderId};

struct TestHarness {
    store: InMemoryStore,
    orders: OrderService<InMemoryStore>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let orders = OrderService::new(store.clone());
        Self { store, orders }
    }

    async fn lesson(&self, topic: &str, space: u32) -> LessonId {
        self.store
            .insert_lesson(NewLesson::new(topic, "H101", 50.0, space))
            .await
            .unwrap()
            .id
    }

    async fn space(&self, id: LessonId) -> u32 {
        self.store.get_lesson(id).await.unwrap().unwrap().space
    }

    fn request(lessons: &[LessonId], seats: i64) -> BookingRequest {
        BookingRequest {
            name: Some("Jane Doe".into()),
            phone_number: Some("07700900123".into()),
            lesson_ids: Some(lessons.iter().map(ToString::to_string).collect()),
            number_of_space: Some(seats.into()),
        }
    }
}

#[tokio::test]
async fn reserve_decrements_every_lesson() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let b = h.lesson("Music", 4).await;

    let order = h
        .orders
        .place_order(TestHarness::request(&[a, b], 2))
        .await
        .unwrap();

    assert_eq!(order.lesson_ids, vec![a, b]);
    assert_eq!(order.number_of_space, 2);
    assert_eq!(h.space(a).await, 3);
    assert_eq!(h.space(b).await, 2);
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn reserve_cancel_scenario() {
    let h = TestHarness::new();
    let a = h.lesson("Physics", 5).await;

    let first = h
        .orders
        .place_order(TestHarness::request(&[a], 3))
        .await
        .unwrap();
    assert_eq!(h.space(a).await, 2);

    let err = h
        .orders
        .place_order(TestHarness::request(&[a], 3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientCapacity { lesson_id, available: 2, .. } if lesson_id == a
    ));
    assert_eq!(h.space(a).await, 2);

    h.orders
        .cancel_order(&first.id.to_string())
        .await
        .unwrap();
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn insufficient_lesson_blocks_the_whole_order() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 2).await;
    let b = h.lesson("Biology", 0).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a, b], 1))
        .await
        .unwrap_err();

    match err {
        BookingError::InsufficientCapacity {
            lesson_id, topic, ..
        } => {
            assert_eq!(lesson_id, b);
            assert_eq!(topic, "Biology");
        }
        other => panic!("expected InsufficientCapacity, got {other:?}"),
    }
    assert_eq!(h.space(a).await, 2);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn missing_lesson_aborts_without_mutation() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let ghost = LessonId::new();

    let err = h
        .orders
        .place_order(TestHarness::request(&[a, ghost], 1))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::LessonNotFound(id) if id == ghost));
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn invalid_request_never_reaches_the_store() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;

    let request = BookingRequest {
        name: Some("John123".into()),
        number_of_space: Some(0.into()),
        ..TestHarness::request(&[a], 1)
    };
    let err = h.orders.place_order(request).await.unwrap_err();

    match err {
        BookingError::Validation(errors) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["name", "numberOfSpace"]);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn duplicate_lesson_reserves_per_occurrence() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 3).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a, a], 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InsufficientCapacity { requested: 4, .. }
    ));
    assert_eq!(h.space(a).await, 3);

    let order = h
        .orders
        .place_order(TestHarness::request(&[a, a], 1))
        .await
        .unwrap();
    assert_eq!(h.space(a).await, 1);

    h.orders.cancel_order(&order.id.to_string()).await.unwrap();
    assert_eq!(h.space(a).await, 3);
}

#[tokio::test]
async fn lost_race_rolls_back_earlier_decrements() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 4).await;
    let b = h.lesson("Music", 2).await;

    // A competing booking takes B's seats after our pre-check passes.
    h.store.steal_seats_before_next_decrement(b, 2).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a, b], 1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::InsufficientCapacity { lesson_id, available: 0, .. } if lesson_id == b
    ));
    assert_eq!(h.space(a).await, 4, "decrement on A must be rolled back");
    assert_eq!(h.space(b).await, 0);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn failed_order_insert_rolls_back_seats() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 4).await;
    h.store.set_fail_order_inserts(true).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a], 2))
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(h.space(a).await, 4);
}

#[tokio::test]
async fn failed_rollback_surfaces_inconsistency() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 4).await;
    h.store.set_fail_order_inserts(true).await;
    h.store.set_fail_increments(true).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a], 2))
        .await
        .unwrap_err();

    match err {
        BookingError::Inconsistency {
            operation, lessons, ..
        } => {
            assert_eq!(operation, "reserve");
            assert_eq!(lessons, vec![a]);
        }
        other => panic!("expected Inconsistency, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelling_twice_reports_not_found() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a], 2))
        .await
        .unwrap();
    let id = order.id.to_string();

    h.orders.cancel_order(&id).await.unwrap();
    assert_eq!(h.space(a).await, 5);

    let err = h.orders.cancel_order(&id).await.unwrap_err();
    assert!(matches!(err, BookingError::OrderNotFound(oid) if oid == order.id));
    assert_eq!(h.space(a).await, 5);
    assert!(matches!(
        h.orders.get_order(&id).await.unwrap_err(),
        BookingError::OrderNotFound(_)
    ));
}

#[tokio::test]
async fn cancel_skips_lessons_that_no_longer_exist() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let b = h.lesson("Music", 5).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a, b], 1))
        .await
        .unwrap();

    assert!(h.store.remove_lesson(b).await);

    let cancelled = h
        .orders
        .cancel_order(&order.id.to_string())
        .await
        .unwrap();
    assert_eq!(cancelled.id, order.id);
    assert_eq!(h.space(a).await, 5);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn cancel_with_failed_delete_changes_nothing() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a], 2))
        .await
        .unwrap();
    h.store.set_fail_order_deletes(true).await;

    let err = h
        .orders
        .cancel_order(&order.id.to_string())
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.space(a).await, 3);
    assert_eq!(h.store.order_count().await, 1);

    h.store.set_fail_order_deletes(false).await;
    h.orders
        .cancel_order(&order.id.to_string())
        .await
        .unwrap();
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn cancel_with_failed_restore_reports_inconsistency() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let b = h.lesson("Music", 5).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a, b], 2))
        .await
        .unwrap();
    h.store.set_fail_increments(true).await;

    let err = h
        .orders
        .cancel_order(&order.id.to_string())
        .await
        .unwrap_err();

    match err {
        BookingError::Inconsistency {
            operation,
            order_id,
            lessons,
            ..
        } => {
            assert_eq!(operation, "cancel");
            assert_eq!(order_id, Some(order.id));
            assert_eq!(lessons, vec![a, b]);
        }
        other => panic!("expected Inconsistency, got {other:?}"),
    }
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.space(a).await, 3);
}

#[tokio::test]
async fn cancel_that_would_overflow_a_counter_reports_inconsistency() {
    let h = TestHarness::new();
    let near_limit = i32::MAX as u32 - 1;
    let a = h.lesson("Art", near_limit).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a], 2))
        .await
        .unwrap();
    // Seats come back from elsewhere while the order is outstanding.
    h.store.increment_space(a, 2).await.unwrap();

    let err = h
        .orders
        .cancel_order(&order.id.to_string())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::Inconsistency { operation: "cancel", ref lessons, .. } if lessons == &[a]
    ));
    assert_eq!(h.space(a).await, near_limit);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn malformed_ids_are_rejected_before_lookup() {
    let h = TestHarness::new();
    assert!(matches!(
        h.orders.cancel_order("42").await.unwrap_err(),
        BookingError::InvalidId(_)
    ));
    assert!(matches!(
        h.orders.get_order("not-an-id").await.unwrap_err(),
        BookingError::InvalidId(_)
    ));
    assert!(matches!(
        h.orders
            .cancel_order(&OrderId::new().to_string())
            .await
            .unwrap_err(),
        BookingError::OrderNotFound(_)
    ));
}

#[tokio::test]
async fn orders_are_joined_with_current_lessons() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    let b = h.lesson("Music", 5).await;

    h.orders
        .place_order(TestHarness::request(&[a], 1))
        .await
        .unwrap();
    let second = h
        .orders
        .place_order(TestHarness::request(&[b, a], 2))
        .await
        .unwrap();

    let listed = h.orders.list_orders().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].order.id, second.id);
    let topics: Vec<_> = listed[0].lessons.iter().map(|l| l.topic.as_str()).collect();
    assert_eq!(topics, vec!["Music", "Art"]);
    // Current data, not a snapshot: A has lost 1 + 2 seats.
    assert_eq!(listed[0].lessons[1].space, 2);

    let single = h.orders.get_order(&second.id.to_string()).await.unwrap();
    assert_eq!(single.lessons.len(), 2);
}

#[tokio::test]
async fn seeding_only_fills_an_empty_catalog() {
    let h = TestHarness::new();
    let lessons = LessonService::new(h.store.clone());

    assert_eq!(
        lessons
            .seed_if_empty(catalog::default_lessons())
            .await
            .unwrap(),
        10
    );
    assert_eq!(
        lessons
            .seed_if_empty(catalog::default_lessons())
            .await
            .unwrap(),
        0
    );
    assert_eq!(lessons.list().await.unwrap().len(), 10);

    let found = lessons.search(Some("45")).await.unwrap();
    let topics: Vec<_> = found.iter().map(|l| l.topic.as_str()).collect();
    assert_eq!(topics, vec!["Biology", "History"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let h = TestHarness::new();
    let a = h.lesson("Chemistry", 5).await;

    let attempts = (0..20).map(|_| {
        let orders = h.orders.clone();
        tokio::spawn(async move { orders.place_order(TestHarness::request(&[a], 1)).await })
    });
    let results = futures_util::future::join_all(attempts).await;

    let mut placed = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => placed += 1,
            Err(BookingError::InsufficientCapacity { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(placed, 5);
    assert_eq!(h.space(a).await, 0);
    assert_eq!(h.store.order_count().await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_multi_lesson_reservations_keep_counts_consistent() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 6).await;
    let b = h.lesson("Music", 3).await;

    let attempts = (0..12).map(|i| {
        let orders = h.orders.clone();
        let lessons = if i % 2 == 0 { vec![a, b] } else { vec![b, a] };
        tokio::spawn(async move { orders.place_order(TestHarness::request(&lessons, 1)).await })
    });
    let placed = futures_util::future::join_all(attempts)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count() as u32;

    // Opposite lesson orders may both lose and roll back, so fewer than three
    // can succeed; counts must still match the orders placed.
    assert!(placed <= 3);
    assert_eq!(h.space(a).await, 6 - placed);
    assert_eq!(h.space(b).await, 3 - placed);
    assert_eq!(h.store.order_count().await, placed as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancellations_restore_once() {
    let h = TestHarness::new();
    let a = h.lesson("History", 5).await;
    let order = h
        .orders
        .place_order(TestHarness::request(&[a], 3))
        .await
        .unwrap();
    let id = order.id.to_string();

    let attempts = (0..8).map(|_| {
        let orders = h.orders.clone();
        let id = id.clone();
        tokio::spawn(async move { orders.cancel_order(&id).await })
    });
    let results = futures_util::future::join_all(attempts).await;

    let mut cancelled = 0;
    for result in results {
        match result.unwrap() {
            Ok(_) => cancelled += 1,
            Err(BookingError::OrderNotFound(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(cancelled, 1);
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn unavailable_store_is_transient() {
    let h = TestHarness::new();
    let a = h.lesson("Art", 5).await;
    h.store.set_unavailable(true).await;

    let err = h
        .orders
        .place_order(TestHarness::request(&[a], 1))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert!(h.orders.list_orders().await.unwrap_err().is_transient());

    h.store.set_unavailable(false).await;
    assert_eq!(h.space(a).await, 5);
}

#[tokio::test]
async fn admin_update_changes_lesson() {
    let h = TestHarness::new();
    let lessons = LessonService::new(h.store.clone());
    let a = h.lesson("Art", 5).await;

    let updated = lessons
        .update(
            &a.to_string(),
            booking::LessonUpdate {
                price: Some(75.0),
                space: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, 75.0);
    assert_eq!(updated.space, 9);
    assert_eq!(updated.topic, "Art");

    let err = lessons
        .update(
            &a.to_string(),
            booking::LessonUpdate {
                space: Some(i64::from(store::MAX_SPACE) + 1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(ref e) if e[0].field == "space"));
    assert_eq!(h.space(a).await, 9);

    let err = lessons
        .update(
            &LessonId::new().to_string(),
            booking::LessonUpdate {
                price: Some(1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::LessonNotFound(_)));
}
