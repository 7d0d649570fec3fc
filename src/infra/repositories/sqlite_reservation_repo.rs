use crate::domain::{models::reservation::{Reservation, ReservationState}, ports::ReservationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub struct SqliteReservationRepo {
    pool: SqlitePool,
}

impl SqliteReservationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Touches the event row so the transaction holds SQLite's write lock
/// before it counts; concurrent joins on the same database queue up here.
async fn lock_event(tx: &mut Transaction<'_, Sqlite>, event_id: &str) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>("UPDATE events SET updated_at = updated_at WHERE id = ? RETURNING capacity")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound("Event not found".into()))
}

async fn count_admitted_in(tx: &mut Transaction<'_, Sqlite>, event_id: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = ? AND state != 'WAITLISTED'")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
}

#[async_trait]
impl ReservationRepository for SqliteReservationRepo {
    async fn create_within_capacity(&self, reservation: &Reservation) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let capacity = lock_event(&mut tx, &reservation.event_id).await?;

        let admitted = count_admitted_in(&mut tx, &reservation.event_id).await?;
        let to_insert = if admitted >= capacity as i64 {
            reservation.waitlisted()
        } else {
            reservation.clone()
        };

        let created = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (id, event_id, participant_id, state, paid_at, checked_in_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&to_insert.id).bind(&to_insert.event_id).bind(&to_insert.participant_id)
            .bind(to_insert.state.as_str()).bind(to_insert.paid_at).bind(to_insert.checked_in_at)
            .bind(to_insert.created_at).bind(to_insert.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn admit_within_capacity(&self, reservation: &Reservation) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let capacity = lock_event(&mut tx, &reservation.event_id).await?;

        if count_admitted_in(&mut tx, &reservation.event_id).await? >= capacity as i64 {
            return Err(AppError::Conflict("Event is full".into()));
        }

        let admitted = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET state = ?, updated_at = ? WHERE id = ? AND state = 'WAITLISTED' RETURNING *"
        )
            .bind(reservation.state.as_str()).bind(reservation.updated_at).bind(&reservation.id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Reservation is no longer waitlisted".into()))?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(admitted)
    }

    async fn transition(&self, next: &Reservation, expected: ReservationState) -> Result<Reservation, AppError> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET state = ?, paid_at = ?, checked_in_at = ?, updated_at = ?
             WHERE id = ? AND state = ?
             RETURNING *"
        )
            .bind(next.state.as_str()).bind(next.paid_at).bind(next.checked_in_at).bind(next.updated_at)
            .bind(&next.id).bind(expected.as_str())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Reservation was modified concurrently".into()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_participant_and_event(&self, participant_id: &str, event_id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE participant_id = ? AND event_id = ?")
            .bind(participant_id).bind(event_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_participant(&self, participant_id: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE participant_id = ? ORDER BY created_at DESC")
            .bind(participant_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE event_id = ? ORDER BY created_at ASC")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_admitted(&self, event_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = ? AND state != 'WAITLISTED'")
            .bind(event_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}
