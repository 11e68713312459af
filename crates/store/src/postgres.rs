use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Datastore, Lesson, LessonId, LessonPatch, LessonSearch, LessonStore, NewLesson, NewOrder,
    Order, OrderId, OrderStore, Result, SpaceUpdate, StoreError,
};

const LESSON_COLUMNS: &str = "id, topic, location, price, space, icon, created_at, updated_at";
const ORDER_COLUMNS: &str =
    "id, name, phone_number, lesson_ids, number_of_space, created_at, updated_at";

/// PostgreSQL-backed datastore.
///
/// Seat changes are single `UPDATE` statements, so the `space >= n` guard is
/// evaluated by the database at write time.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_lesson(row: PgRow) -> Result<Lesson> {
        Ok(Lesson {
            id: LessonId::from_uuid(row.try_get::<Uuid, _>("id")?),
            topic: row.try_get("topic")?,
            location: row.try_get("location")?,
            price: row.try_get("price")?,
            space: to_seats(row.try_get("space")?)?,
            icon: row.try_get("icon")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let lesson_ids: Vec<Uuid> = row.try_get("lesson_ids")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            phone_number: row.try_get("phone_number")?,
            lesson_ids: lesson_ids.into_iter().map(LessonId::from_uuid).collect(),
            number_of_space: to_seats(row.try_get("number_of_space")?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

/// SQLSTATE raised when integer arithmetic leaves the column's range.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

fn to_seats(value: i32) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidDocument(format!("negative seat count {value}")))
}

fn to_column(seats: u32) -> Result<i32> {
    i32::try_from(seats)
        .map_err(|_| StoreError::InvalidDocument(format!("seat count {seats} out of range")))
}

#[async_trait]
impl LessonStore for PostgresStore {
    async fn insert_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO lessons (id, topic, location, price, space, icon)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&lesson.topic)
        .bind(&lesson.location)
        .bind(lesson.price)
        .bind(to_column(lesson.space)?)
        .bind(&lesson.icon)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_lesson(row)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>> {
        sqlx::query(&format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_lesson)
            .transpose()
    }

    async fn get_lessons(&self, ids: &[LessonId]) -> Result<Vec<Lesson>> {
        let uuids: Vec<Uuid> = ids.iter().map(LessonId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ANY($1)"
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lesson).collect()
    }

    async fn list_lessons(&self) -> Result<Vec<Lesson>> {
        let rows = sqlx::query(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons ORDER BY topic ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lesson).collect()
    }

    async fn search_lessons(&self, search: &LessonSearch) -> Result<Vec<Lesson>> {
        if search.is_all() {
            return self.list_lessons().await;
        }

        // POSITION instead of LIKE so that '%' and '_' in the query match literally.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LESSON_COLUMNS}
            FROM lessons
            WHERE POSITION($1 IN LOWER(topic)) > 0
               OR POSITION($1 IN LOWER(location)) > 0
               OR ($2::DOUBLE PRECISION IS NOT NULL AND (price = $2 OR space = $2))
            ORDER BY topic ASC, id ASC
            "#
        ))
        .bind(&search.text)
        .bind(search.number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lesson).collect()
    }

    async fn count_lessons(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn update_lesson(&self, id: LessonId, patch: LessonPatch) -> Result<Option<Lesson>> {
        let space = patch.space.map(to_column).transpose()?;
        sqlx::query(&format!(
            r#"
            UPDATE lessons SET
                topic = COALESCE($2, topic),
                location = COALESCE($3, location),
                price = COALESCE($4, price),
                space = COALESCE($5, space),
                icon = COALESCE($6, icon),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.topic)
        .bind(patch.location)
        .bind(patch.price)
        .bind(space)
        .bind(patch.icon)
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_lesson)
        .transpose()
    }

    async fn try_decrement_space(&self, id: LessonId, seats: u32) -> Result<SpaceUpdate> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE lessons
            SET space = space - $2, updated_at = NOW()
            WHERE id = $1 AND space >= $2
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(to_column(seats)?)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(SpaceUpdate::Applied(Self::row_to_lesson(row)?));
        }

        // The guard rejected the write; find out why.
        let current: Option<i32> = sqlx::query_scalar("SELECT space FROM lessons WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some(space) => {
                tracing::debug!(%id, seats, space, "conditional decrement refused");
                Ok(SpaceUpdate::Insufficient {
                    available: to_seats(space)?,
                })
            }
            None => {
                tracing::debug!(%id, "conditional decrement on missing lesson");
                Ok(SpaceUpdate::Missing)
            }
        }
    }

    async fn increment_space(&self, id: LessonId, seats: u32) -> Result<Option<Lesson>> {
        sqlx::query(&format!(
            r#"
            UPDATE lessons
            SET space = space + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(to_column(seats)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            let overflow = matches!(
                &e,
                sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
            );
            if overflow {
                tracing::error!(%id, seats, "seat count would overflow");
                StoreError::SpaceOverflow(id)
            } else {
                StoreError::from(e)
            }
        })?
        .map(Self::row_to_lesson)
        .transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let lesson_ids: Vec<Uuid> = order.lesson_ids.iter().map(LessonId::as_uuid).collect();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (id, name, phone_number, lesson_ids, number_of_space)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&order.name)
        .bind(&order.phone_number)
        .bind(lesson_ids)
        .bind(to_column(order.number_of_space)?)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_order)
            .transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Datastore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
