use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use argon2::{password_hash::{SaltString, PasswordHasher}, Argon2};
use rand::rngs::OsRng;
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::error::AppError;
use crate::domain::models::user::{Role, User};
use crate::domain::ports::{
    Clock, SystemClock, UserRepository, AuthRepository, ProfileRepository,
    FacilityRepository, EventRepository, ReservationRepository,
};
use crate::domain::services::{auth_service::AuthService, reservation_service::ReservationService};
use crate::infra::storage::local_photo_store::LocalPhotoStore;
use crate::infra::repositories::{
    postgres_user_repo::PostgresUserRepo, postgres_auth_repo::PostgresAuthRepo,
    postgres_profile_repo::PostgresProfileRepo, postgres_facility_repo::PostgresFacilityRepo,
    postgres_event_repo::PostgresEventRepo, postgres_reservation_repo::PostgresReservationRepo,
    sqlite_user_repo::SqliteUserRepo, sqlite_auth_repo::SqliteAuthRepo,
    sqlite_profile_repo::SqliteProfileRepo, sqlite_facility_repo::SqliteFacilityRepo,
    sqlite_event_repo::SqliteEventRepo, sqlite_reservation_repo::SqliteReservationRepo,
};

pub struct Repositories {
    pub user_repo: Arc<dyn UserRepository>,
    pub auth_repo: Arc<dyn AuthRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub facility_repo: Arc<dyn FacilityRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            auth_repo: Arc::new(SqliteAuthRepo::new(pool.clone())),
            profile_repo: Arc::new(SqliteProfileRepo::new(pool.clone())),
            facility_repo: Arc::new(SqliteFacilityRepo::new(pool.clone())),
            event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
            reservation_repo: Arc::new(SqliteReservationRepo::new(pool)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            user_repo: Arc::new(PostgresUserRepo::new(pool.clone())),
            auth_repo: Arc::new(PostgresAuthRepo::new(pool.clone())),
            profile_repo: Arc::new(PostgresProfileRepo::new(pool.clone())),
            facility_repo: Arc::new(PostgresFacilityRepo::new(pool.clone())),
            event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
            reservation_repo: Arc::new(PostgresReservationRepo::new(pool)),
        }
    }
}

/// Wires services on top of a set of repositories.
pub fn assemble_state(config: &Config, repos: Repositories, clock: Arc<dyn Clock>) -> Result<AppState, AppError> {
    let auth_service = Arc::new(AuthService::new(repos.auth_repo.clone(), config.clone())?);
    let reservation_service = Arc::new(ReservationService::new(
        repos.event_repo.clone(),
        repos.reservation_repo.clone(),
        repos.profile_repo.clone(),
        clock.clone(),
    ));
    let photo_store = Arc::new(LocalPhotoStore::new(
        config.upload_dir.clone(),
        config.public_assets_base_url.clone(),
    ));

    Ok(AppState {
        config: config.clone(),
        user_repo: repos.user_repo,
        auth_repo: repos.auth_repo,
        profile_repo: repos.profile_repo,
        facility_repo: repos.facility_repo,
        event_repo: repos.event_repo,
        reservation_repo: repos.reservation_repo,
        auth_service,
        reservation_service,
        photo_store,
        clock,
    })
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let database_url = &config.database_url;

    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().map_err(AppError::Database)?;
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .map_err(AppError::Database)?;

        run_postgres_migrations(&pool).await?;
        Repositories::postgres(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(AppError::Database)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(AppError::Database)?;

        run_sqlite_migrations(&pool).await?;
        Repositories::sqlite(pool)
    };

    let state = assemble_state(config, repos, Arc::new(SystemClock))?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        seed_admin(&state, email, password).await?;
    }

    Ok(state)
}

/// Creates the admin account once; registration never hands out ADMIN.
pub async fn seed_admin(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    if state.user_repo.find_by_email(email).await?.is_some() {
        return Ok(());
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::Internal)?
        .to_string();

    let admin = User::new(email.to_string(), password_hash, Role::Admin, "Administrator".to_string());
    state.user_repo.create(&admin).await?;
    info!("Seeded admin account {}", email);
    Ok(())
}

async fn run_postgres_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run Postgres migrations: {}", e)))
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithMsg(format!("Failed to run SQLite migrations: {}", e)))
}
