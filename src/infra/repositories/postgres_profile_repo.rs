use crate::domain::{models::profile::ParticipantProfile, ports::ProfileRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresProfileRepo {
    pool: PgPool,
}

impl PostgresProfileRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepo {
    async fn upsert(&self, profile: &ParticipantProfile) -> Result<ParticipantProfile, AppError> {
        sqlx::query_as::<_, ParticipantProfile>(
            r#"INSERT INTO participant_profiles (user_id, first_name, last_name, phone, birth_date, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT (user_id) DO UPDATE SET
                   first_name = excluded.first_name,
                   last_name = excluded.last_name,
                   phone = excluded.phone,
                   birth_date = excluded.birth_date,
                   updated_at = excluded.updated_at
               RETURNING *"#
        )
            .bind(&profile.user_id)
            .bind(&profile.first_name)
            .bind(&profile.last_name)
            .bind(&profile.phone)
            .bind(profile.birth_date)
            .bind(profile.created_at)
            .bind(profile.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<ParticipantProfile>, AppError> {
        sqlx::query_as::<_, ParticipantProfile>("SELECT * FROM participant_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
