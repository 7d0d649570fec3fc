use sports_events_backend::{
    domain::models::{
        event::{Event, PriceType},
        reservation::{Reservation, ReservationState},
        user::{Role, User},
    },
    domain::ports::{EventRepository, ReservationRepository, UserRepository},
    infra::repositories::{
        postgres_event_repo::PostgresEventRepo,
        postgres_reservation_repo::PostgresReservationRepo,
        postgres_user_repo::PostgresUserRepo,
    },
};
use chrono::{Duration, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::test]
async fn test_last_slot_race_on_postgres() {
    let Ok(db_url) = std::env::var("DATABASE_URL") else {
        println!("Skipping concurrency test (DATABASE_URL not set)");
        return;
    };
    if !db_url.starts_with("postgres") {
        println!("Skipping concurrency test (not targeting Postgres)");
        return;
    }

    let opts = PgConnectOptions::from_str(&db_url)
        .unwrap()
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect_with(opts)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!("./migrations/postgres").run(&pool).await.expect("Failed to migrate");

    let users = PostgresUserRepo::new(pool.clone());
    let events = PostgresEventRepo::new(pool.clone());
    let repo = Arc::new(PostgresReservationRepo::new(pool.clone()));

    let coach = users.create(&User::new(
        format!("coach-{}@race.test", Uuid::new_v4().simple()),
        "x".to_string(),
        Role::Coach,
        "Coach".to_string(),
    )).await.unwrap();

    let now = Utc::now();
    let capacity = 3;
    let event = events.create(&Event {
        id: Uuid::new_v4().to_string(),
        owner_id: coach.id.clone(),
        backup_coach_id: None,
        title: "Race".to_string(),
        description: String::new(),
        sport: "running".to_string(),
        start_time: now + Duration::days(10),
        end_time: now + Duration::days(10) + Duration::hours(1),
        capacity,
        price_type: PriceType::Free,
        participation_fee: None,
        facility_id: None,
        salon_id: None,
        location: Some("Track".to_string()),
        photo_url: None,
        created_at: now,
        updated_at: now,
    }).await.unwrap();

    let contenders = 20;
    let mut set = JoinSet::new();

    for i in 0..contenders {
        let participant = users.create(&User::new(
            format!("p{}-{}@race.test", i, Uuid::new_v4().simple()),
            "x".to_string(),
            Role::Participant,
            format!("P{}", i),
        )).await.unwrap();

        let repo_clone = repo.clone();
        let draft = Reservation::admitted(&event, participant.id, now);
        set.spawn(async move {
            repo_clone.create_within_capacity(&draft).await.expect("join failed")
        });
    }

    let mut states = Vec::new();
    while let Some(res) = set.join_next().await {
        states.push(res.unwrap().state);
    }

    let admitted = states.iter().filter(|s| s.is_admitted()).count();
    let waitlisted = states.iter().filter(|s| **s == ReservationState::Waitlisted).count();

    assert_eq!(admitted, capacity as usize, "Capacity exceeded! Race condition exists.");
    assert_eq!(waitlisted, contenders - capacity as usize);
    assert_eq!(repo.count_admitted(&event.id).await.unwrap(), capacity as i64);

    sqlx::query("DELETE FROM events WHERE id = $1").bind(&event.id).execute(&pool).await.unwrap();
}
