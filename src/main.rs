use edustream::db::{connect, run_migrations};
use edustream::env::{AppConfig, load_environment};
use edustream::telemetry::init_tracing;
use edustream::{TELEMETRY_GUARD, init_rocket};
use tracing::{error, info};

#[rocket::launch]
async fn rocket() -> _ {
    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    let config = AppConfig::from_env().expect("Invalid configuration");

    if let Some(guard) = init_tracing(&config) {
        if let Ok(mut slot) = TELEMETRY_GUARD.lock() {
            *slot = Some(guard);
        }
    }

    let pool = connect(&config.database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Running database migrations...");
    match run_migrations(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    init_rocket(pool).await
}
