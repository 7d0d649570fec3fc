use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Facility {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl Facility {
    pub fn new(owner_id: String, name: String, address: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            name,
            address,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Salon {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Salon {
    pub fn new(facility_id: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            facility_id,
            name,
            created_at: Utc::now(),
        }
    }
}
