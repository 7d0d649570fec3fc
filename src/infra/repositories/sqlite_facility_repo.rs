use crate::domain::{models::facility::{Facility, Salon}, ports::FacilityRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteFacilityRepo {
    pool: SqlitePool,
}

impl SqliteFacilityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FacilityRepository for SqliteFacilityRepo {
    async fn create(&self, facility: &Facility) -> Result<Facility, AppError> {
        sqlx::query_as::<_, Facility>(
            "INSERT INTO facilities (id, owner_id, name, address, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&facility.id).bind(&facility.owner_id).bind(&facility.name)
            .bind(&facility.address).bind(facility.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Facility>, AppError> {
        sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Facility>, AppError> {
        sqlx::query_as::<_, Facility>("SELECT * FROM facilities ORDER BY name ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn create_salon(&self, salon: &Salon) -> Result<Salon, AppError> {
        sqlx::query_as::<_, Salon>(
            "INSERT INTO salons (id, facility_id, name, created_at) VALUES (?, ?, ?, ?) RETURNING *"
        )
            .bind(&salon.id).bind(&salon.facility_id).bind(&salon.name).bind(salon.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_salon(&self, id: &str) -> Result<Option<Salon>, AppError> {
        sqlx::query_as::<_, Salon>("SELECT * FROM salons WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_salons(&self, facility_id: &str) -> Result<Vec<Salon>, AppError> {
        sqlx::query_as::<_, Salon>("SELECT * FROM salons WHERE facility_id = ? ORDER BY name ASC")
            .bind(facility_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
