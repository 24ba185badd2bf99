use anyhow::{Context, Result};
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};
use tracing::info;

/// Which store's tables a database carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Accounts,
    Orders,
}

impl Schema {
    fn migrator(self) -> Migrator {
        let mut migrator = match self {
            Schema::Accounts => sqlx::migrate!("./migrations/accounts"),
            Schema::Orders => sqlx::migrate!("./migrations/orders"),
        };
        // Both stores may share one database and one `_sqlx_migrations` table.
        migrator.set_ignore_missing(true);
        migrator
    }
}

/// Opens a pool against `database_url` and brings `schema` up to date.
pub async fn init_db(database_url: &str, schema: Schema) -> Result<PgPool> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Err(anyhow::anyhow!(
            "database url must start with postgres:// or postgresql://"
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    migrate(&pool, schema).await?;
    Ok(pool)
}

/// Applies `schema` to an already open pool.
pub async fn migrate(pool: &PgPool, schema: Schema) -> Result<()> {
    schema
        .migrator()
        .run(pool)
        .await
        .with_context(|| format!("Failed to run {schema:?} migrations"))?;
    info!("{:?} schema is up to date", schema);
    Ok(())
}
