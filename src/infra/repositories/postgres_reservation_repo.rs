use crate::domain::{models::reservation::{Reservation, ReservationState}, ports::ReservationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

pub struct PostgresReservationRepo {
    pool: PgPool,
}

impl PostgresReservationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row-locks the event so concurrent joins on it are serialized until commit.
async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: &str) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::NotFound("Event not found".into()))
}

async fn count_admitted_in(tx: &mut Transaction<'_, Postgres>, event_id: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND state != 'WAITLISTED'")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepo {
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
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
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
            "UPDATE reservations SET state = $1, updated_at = $2 WHERE id = $3 AND state = 'WAITLISTED' RETURNING *"
        )
            .bind(reservation.state.as_str()).bind(reservation.updated_at).bind(&reservation.id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Reservation is no longer waitlisted".into()))?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(admitted)
    }

    async fn transition(&self, next: &Reservation, expected: ReservationState) -> Result<Reservation, AppError> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET state = $1, paid_at = $2, checked_in_at = $3, updated_at = $4
             WHERE id = $5 AND state = $6
             RETURNING *"
        )
            .bind(next.state.as_str()).bind(next.paid_at).bind(next.checked_in_at).bind(next.updated_at)
            .bind(&next.id).bind(expected.as_str())
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::Conflict("Reservation was modified concurrently".into()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_participant_and_event(&self, participant_id: &str, event_id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE participant_id = $1 AND event_id = $2")
            .bind(participant_id).bind(event_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_participant(&self, participant_id: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE participant_id = $1 ORDER BY created_at DESC")
            .bind(participant_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE event_id = $1 ORDER BY created_at ASC")
            .bind(event_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_admitted(&self, event_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND state != 'WAITLISTED'")
            .bind(event_id).fetch_one(&self.pool).await.map_err(AppError::Database)
    }
}
