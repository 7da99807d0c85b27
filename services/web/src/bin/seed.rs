//! services/web/src/bin/seed.rs
//!
//! Loads the demo catalog into the configured database. Rows that already
//! exist are left alone, so the binary can be run repeatedly.

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{
    adapters::{demo, DbAdapter},
    config::Config,
    error::ApiError,
};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| ApiError::Internal("DATABASE_URL is required to seed the catalog".to_string()))?;

    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await?;
    let db = DbAdapter::new(db_pool);
    db.run_migrations().await?;

    let (mut courses_added, mut lessons_added) = (0, 0);
    for course in demo::courses() {
        if db.insert_course(&course).await? {
            courses_added += 1;
        } else {
            warn!(course = %course.title, "Course already present, skipping");
        }
    }
    for lesson in demo::lessons() {
        if db.insert_lesson(&lesson).await? {
            lessons_added += 1;
        }
    }

    info!(courses_added, lessons_added, "Demo catalog seeded");
    Ok(())
}
