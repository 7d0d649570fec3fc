use crate::domain::{models::event::{Event, EventFilter, Page}, ports::EventRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: &str) -> Result<(), AppError> {
    sqlx::query_scalar::<_, String>("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound("Event not found".into()))?;
    Ok(())
}

async fn count_admitted_in(tx: &mut Transaction<'_, Postgres>, event_id: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND state != 'WAITLISTED'")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
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
        builder.push(" AND title ILIKE ").push_bind(pattern).push(" ESCAPE '\\'");
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
impl EventRepository for PostgresEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (
                id, owner_id, backup_coach_id, title, description, sport,
                start_time, end_time, capacity, price_type, participation_fee,
                facility_id, salon_id, location, photo_url, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
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
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64), AppError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events WHERE 1 = 1");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM events WHERE 1 = 1");
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
                backup_coach_id=$1, title=$2, description=$3, sport=$4,
                start_time=$5, end_time=$6, capacity=$7, price_type=$8, participation_fee=$9,
                facility_id=$10, salon_id=$11, location=$12, photo_url=$13, updated_at=$14
               WHERE id=$15 RETURNING *"#
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
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
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
