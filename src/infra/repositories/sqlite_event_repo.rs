use crate::domain::{models::event::{Event, EventFilter, Page}, ports::EventRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Holds SQLite's write lock from here until the transaction ends.
async fn lock_event(tx: &mut Transaction<'_, Sqlite>, event_id: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE events SET updated_at = updated_at WHERE id = ?")
        .bind(event_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Event not found".into()));
    }
    Ok(())
}

async fn count_admitted_in(tx: &mut Transaction<'_, Sqlite>, event_id: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = ? AND state != 'WAITLISTED'")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &EventFilter) {
    if let Some(price_type) = filter.price_type {
        builder.push(" AND price_type = ").push_bind(price_type.as_str());
    }
    if let Some(owner_id) = &filter.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id.clone());
    }
    if let Some(sport) = &filter.sport {
        builder.push(" AND sport = ").push_bind(sport.clone());
    }
    if let Some(pattern) = filter.search_pattern() {
        builder.push(" AND title LIKE ").push_bind(pattern).push(" ESCAPE '\\'");
    }
    if let Some(from) = filter.from {
        builder.push(" AND start_time >= ").push_bind(from);
    }
    if let Some(after) = filter.after {
        builder.push(" AND start_time > ").push_bind(after);
    }
    if let Some(to) = filter.to {
        builder.push(" AND start_time <= ").push_bind(to);
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (
                id, owner_id, backup_coach_id, title, description, sport,
                start_time, end_time, capacity, price_type, participation_fee,
                facility_id, salon_id, location, photo_url, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&event.id)
            .bind(&event.owner_id)
            .bind(&event.backup_coach_id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.sport)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.capacity)
            .bind(event.price_type.as_str())
            .bind(event.participation_fee)
            .bind(&event.facility_id)
            .bind(&event.salon_id)
            .bind(&event.location)
            .bind(&event.photo_url)
            .bind(event.created_at)
            .bind(event.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64), AppError> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM events WHERE 1 = 1");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM events WHERE 1 = 1");
        push_filters(&mut query, filter);
        query.push(" ORDER BY start_time ASC, id ASC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let events = query.build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok((events, total))
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock_event(&mut tx, &event.id).await?;

        let admitted = count_admitted_in(&mut tx, &event.id).await?;
        if (event.capacity as i64) < admitted {
            return Err(AppError::Conflict(format!(
                "capacity cannot drop below the {} admitted participants", admitted
            )));
        }

        let updated = sqlx::query_as::<_, Event>(
            r#"UPDATE events SET
                backup_coach_id=?, title=?, description=?, sport=?,
                start_time=?, end_time=?, capacity=?, price_type=?, participation_fee=?,
                facility_id=?, salon_id=?, location=?, photo_url=?, updated_at=?
               WHERE id=? RETURNING *"#
        )
            .bind(&event.backup_coach_id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.sport)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(event.capacity)
            .bind(event.price_type.as_str())
            .bind(event.participation_fee)
            .bind(&event.facility_id)
            .bind(&event.salon_id)
            .bind(&event.location)
            .bind(&event.photo_url)
            .bind(event.updated_at)
            .bind(&event.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".into()));
        }
        Ok(())
    }
}
