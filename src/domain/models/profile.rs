use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ParticipantProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParticipantProfile {
    pub fn new(user_id: String, first_name: String, last_name: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            first_name,
            last_name,
            phone: None,
            birth_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}
