use edustream::Error;
use edustream::db::{connect, run_migrations};
use edustream::enrollment::reconcile_enrollments;
use edustream::env::{AppConfig, load_environment};
use edustream::telemetry::init_tracing;

#[rocket::main]
async fn main() -> Result<(), Error> {
    load_environment().map_err(|e| anyhow::anyhow!("Failed to load environment: {}", e))?;

    let config = AppConfig::from_env()?;
    let _guard = init_tracing(&config);

    let pool = connect(&config.database_url).await?;
    run_migrations(&pool).await?;

    let report = reconcile_enrollments(&pool).await?;

    if report.total() == 0 {
        println!("Enrollments are consistent ✓");
    } else {
        println!("Repaired one-sided enrollments:");
        println!("    Roster entries added: {}", report.roster_entries_added);
        println!("    Learner enrollments added: {}", report.enrollments_added);
    }

    pool.close().await;
    Ok(())
}
