use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        ensure_schema(&pool).await?;

        Ok(Self { pool })
    }
}

/// Creates the `cotations` table and its listing index when missing.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cotations (
            id UUID PRIMARY KEY,
            user_id TEXT NOT NULL,
            user_email TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            main_status TEXT NOT NULL,
            payload JSONB NOT NULL,
            all_insurer_quotes JSONB NOT NULL DEFAULT '[]'::jsonb
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS cotations_user_created_idx ON cotations (user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("✓ Cotations schema ready");
    Ok(())
}
