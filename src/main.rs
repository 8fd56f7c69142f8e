use dotenvy::dotenv;
use gradebook::{
    config::{database, seed},
    core::grading,
    errors::{Error, Result},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed grading policy and subjects into a fresh database
    match seed::load_default_config() {
        Ok(config) => {
            seed::seed_reference_data(&db, &config)
                .await
                .inspect_err(|e| error!("Failed to seed reference data: {}", e))?;
        }
        Err(Error::Config { message }) => {
            warn!("Skipping reference data seed: {}", message);
        }
        Err(e) => return Err(e),
    }

    // 5. Report grading policy convention violations
    let policy = grading::load_active_policy(&db).await?;
    let issues = policy.audit();
    if issues.is_empty() {
        info!(
            "Grading policy has {} active bands and no issues.",
            policy.bands().len()
        );
    } else {
        for issue in &issues {
            warn!("Grading policy issue: {:?}", issue);
        }
    }

    Ok(())
}
