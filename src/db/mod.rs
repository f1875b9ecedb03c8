pub mod collections;
pub mod store;

use sqlx::{postgres::PgPoolOptions, PgPool};

pub use collections::PgStore;
pub use store::{
    CommentStore, ContentStore, LikeCounter, Lookup, PostListings, SimilarListings, Unavailable,
};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// Read pool settings through `lookup`; `None` when no database URL is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty())?;
        let number = |key: &str, fallback: u64| {
            lookup(key)
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback)
        };

        Some(Self {
            url,
            max_connections: number("DB_POOL_MAX", 10) as u32,
            min_connections: number("DB_POOL_MIN", 2) as u32,
            connect_timeout_secs: number("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_secs: number("DB_IDLE_TIMEOUT", 300),
        })
    }
}

/// Open the pool and make one round trip so a bad URL fails at startup.
pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<std::time::Duration, sqlx::Error> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(start.elapsed())
}

/// Create the three content collections if they are missing.
///
/// Image columns are JSONB and never SQL NULL: an absent main image is the
/// JSON value `null`, an empty gallery is `[]`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id BIGSERIAL PRIMARY KEY,
            slug TEXT NOT NULL,
            title TEXT NOT NULL,
            excerpt TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'Real Estate',
            is_featured BOOLEAN NOT NULL DEFAULT false,
            cover_image JSONB NOT NULL DEFAULT 'null'::jsonb,
            gallery JSONB NOT NULL DEFAULT '[]'::jsonb,
            author JSONB NOT NULL DEFAULT '{}'::jsonb,
            likes INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id BIGSERIAL PRIMARY KEY,
            post_id BIGINT NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE,
            author TEXT NOT NULL DEFAULT 'Anonymous',
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id BIGSERIAL PRIMARY KEY,
            slug TEXT NOT NULL,
            service TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT 'current',
            overview TEXT NOT NULL DEFAULT '',
            details TEXT NOT NULL DEFAULT '',
            hero_image TEXT NOT NULL DEFAULT '',
            main_image JSONB NOT NULL DEFAULT 'null'::jsonb,
            gallery JSONB NOT NULL DEFAULT '[]'::jsonb,
            location TEXT NOT NULL DEFAULT '',
            year_completed TEXT NOT NULL DEFAULT '',
            project_type TEXT NOT NULL DEFAULT '',
            key_features TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id BIGSERIAL PRIMARY KEY,
            slug TEXT NOT NULL,
            title TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            price TEXT NOT NULL DEFAULT '',
            property_type TEXT NOT NULL DEFAULT '',
            bedrooms INTEGER,
            bathrooms INTEGER,
            area TEXT NOT NULL DEFAULT '',
            features TEXT[] NOT NULL DEFAULT '{}',
            description TEXT NOT NULL DEFAULT '',
            agent JSONB NOT NULL DEFAULT '{}'::jsonb,
            main_image JSONB NOT NULL DEFAULT 'null'::jsonb,
            gallery JSONB NOT NULL DEFAULT '[]'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Several statements in one batch need the simple query protocol.
    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_blog_posts_slug ON blog_posts(slug);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_category ON blog_posts(category);
        CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_projects_slug ON projects(slug);
        CREATE INDEX IF NOT EXISTS idx_projects_service ON projects(service);
        CREATE INDEX IF NOT EXISTS idx_properties_slug ON properties(slug);
        CREATE INDEX IF NOT EXISTS idx_properties_type ON properties(property_type)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}
