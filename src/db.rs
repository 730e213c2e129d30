use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::AppConfig;
use crate::migrator::Migrator;

pub type DbPool = DatabaseConnection;

/// Establishes a database connection pool from application config.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(cfg.database_url.clone());
    opts.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(!cfg.is_production());

    let db = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(db)
}

/// Applies pending schema migrations.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;
    info!("Database migrations applied");
    Ok(())
}
