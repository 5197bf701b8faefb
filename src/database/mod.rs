use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::Type;
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::errors::AppError;
use crate::models::{CreateTourRequest, Role, Tour, UpdateTourRequest, User};
use crate::query::{FilterCondition, FilterValue, Query};

/// Database connection pool
pub type DbPool = Pool;

const USER_COLUMNS: &str = "id, name, email, photo, role, password_hash, active, \
     password_changed_at, password_reset_token, password_reset_expires, created_at";

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
     ratings_average, ratings_quantity, price, summary, description, image_cover, \
     secret_tour, created_at";

/// Columns exposed on list endpoints when the client requests no
/// projection. Password and reset-token columns are never in this set.
pub const USER_PUBLIC_COLUMNS: &[&str] = &["id", "name", "email", "photo", "role", "created_at"];

pub const TOUR_PUBLIC_COLUMNS: &[&str] = &[
    "id",
    "name",
    "slug",
    "duration",
    "max_group_size",
    "difficulty",
    "ratings_average",
    "ratings_quantity",
    "price",
    "summary",
    "description",
    "image_cover",
    "created_at",
];

/// Database service
pub struct DatabaseService {
    pool: DbPool,
}

impl DatabaseService {
    /// Create a new database service with connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.connect_timeout = Some(std::time::Duration::from_secs(config.connect_timeout_seconds));
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.max_connections as usize));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::unexpected(format!("failed to create pool: {}", e)))?;

        // Test connection
        let client = pool.get().await?;
        client.execute("SELECT 1", &[]).await?;

        log::info!("Database connection established");

        Ok(Self { pool })
    }

    pub async fn get_client(&self) -> Result<deadpool_postgres::Client, AppError> {
        Ok(self.pool.get().await?)
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> Result<(), AppError> {
        let client = self.get_client().await?;

        client.execute("CREATE EXTENSION IF NOT EXISTS pgcrypto", &[]).await.ok();

        client.execute("\
            CREATE TABLE IF NOT EXISTS users (\
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),\
                name VARCHAR(100) NOT NULL,\
                email VARCHAR(255) UNIQUE NOT NULL,\
                photo VARCHAR(255) NOT NULL DEFAULT 'default.jpg',\
                role VARCHAR(20) NOT NULL DEFAULT 'user',\
                password_hash VARCHAR(255) NOT NULL,\
                active BOOLEAN NOT NULL DEFAULT true,\
                password_changed_at TIMESTAMPTZ,\
                password_reset_token VARCHAR(64),\
                password_reset_expires TIMESTAMPTZ,\
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\
                CONSTRAINT valid_role CHECK (role IN ('user', 'admin', 'lead-guide', 'guide'))\
            )\
        ", &[]).await?;

        client.execute("\
            CREATE TABLE IF NOT EXISTS tours (\
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),\
                name VARCHAR(40) UNIQUE NOT NULL,\
                slug VARCHAR(60) NOT NULL,\
                duration BIGINT NOT NULL,\
                max_group_size BIGINT NOT NULL,\
                difficulty VARCHAR(20) NOT NULL,\
                ratings_average DOUBLE PRECISION NOT NULL DEFAULT 4.5,\
                ratings_quantity BIGINT NOT NULL DEFAULT 0,\
                price BIGINT NOT NULL,\
                summary TEXT NOT NULL,\
                description TEXT,\
                image_cover VARCHAR(255) NOT NULL,\
                secret_tour BOOLEAN NOT NULL DEFAULT false,\
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\
                CONSTRAINT valid_difficulty CHECK (difficulty IN ('easy', 'medium', 'difficult'))\
            )\
        ", &[]).await?;

        client.execute("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)", &[]).await?;
        client.execute("CREATE INDEX IF NOT EXISTS idx_users_reset_token ON users(password_reset_token)", &[]).await?;
        client.execute("CREATE INDEX IF NOT EXISTS idx_tours_slug ON tours(slug)", &[]).await?;
        client.execute("CREATE INDEX IF NOT EXISTS idx_tours_price ON tours(price)", &[]).await?;

        log::info!("Database schema initialized");
        Ok(())
    }

    /// Create a new user. Email is stored lowercased; a duplicate surfaces
    /// as a validation error, not a store error.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let client = self.get_client().await?;
        let email = email.to_lowercase();

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO users (name, email, password_hash) \
                     VALUES ($1, $2, $3) RETURNING {}",
                    USER_COLUMNS
                ),
                &[&name, &email, &password_hash],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::validation("Email already in use")
                } else {
                    AppError::from(e)
                }
            })?;

        Ok(Self::row_to_user(&row))
    }

    /// Get an active user by email, password hash included.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let client = self.get_client().await?;
        let email = email.to_lowercase();

        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM users WHERE email = $1 AND active = true",
                    USER_COLUMNS
                ),
                &[&email],
            )
            .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    /// Get an active user by id
    pub async fn find_user_by_id(&self, id: &Uuid) -> Result<Option<User>, AppError> {
        let client = self.get_client().await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM users WHERE id = $1 AND active = true",
                    USER_COLUMNS
                ),
                &[id],
            )
            .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    /// Set a new password. The changed-at timestamp is backdated one second
    /// so tokens issued in the same clock second are still invalidated, and
    /// any outstanding reset token is consumed in the same write.
    pub async fn update_password(&self, user_id: &Uuid, password_hash: &str) -> Result<(), AppError> {
        let client = self.get_client().await?;

        client
            .execute(
                "UPDATE users \
                 SET password_hash = $2, \
                     password_changed_at = NOW() - INTERVAL '1 second', \
                     password_reset_token = NULL, \
                     password_reset_expires = NULL \
                 WHERE id = $1",
                &[user_id, &password_hash],
            )
            .await?;

        Ok(())
    }

    /// Store a reset-token hash with its expiry. A single UPDATE, so a new
    /// request atomically overwrites any prior outstanding token.
    pub async fn set_password_reset(
        &self,
        user_id: &Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let client = self.get_client().await?;

        client
            .execute(
                "UPDATE users \
                 SET password_reset_token = $2, password_reset_expires = $3 \
                 WHERE id = $1",
                &[user_id, &token_hash, &expires_at],
            )
            .await?;

        Ok(())
    }

    /// Roll back a reset token, but only if it is still the one this
    /// request stored; a racing newer token survives.
    pub async fn clear_password_reset(&self, user_id: &Uuid, token_hash: &str) -> Result<(), AppError> {
        let client = self.get_client().await?;

        client
            .execute(
                "UPDATE users \
                 SET password_reset_token = NULL, password_reset_expires = NULL \
                 WHERE id = $1 AND password_reset_token = $2",
                &[user_id, &token_hash],
            )
            .await?;

        Ok(())
    }

    /// Find the active user holding an unexpired reset token.
    pub async fn find_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let client = self.get_client().await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM users \
                     WHERE password_reset_token = $1 \
                       AND password_reset_expires > NOW() \
                       AND active = true",
                    USER_COLUMNS
                ),
                &[&token_hash],
            )
            .await?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    /// Update profile fields, leaving anything not provided untouched.
    pub async fn update_user_profile(
        &self,
        user_id: &Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        let client = self.get_client().await?;
        let email = email.map(str::to_lowercase);

        let row = client
            .query_opt(
                &format!(
                    "UPDATE users \
                     SET name = COALESCE($2, name), email = COALESCE($3, email) \
                     WHERE id = $1 AND active = true RETURNING {}",
                    USER_COLUMNS
                ),
                &[user_id, &name, &email],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::validation("Email already in use")
                } else {
                    AppError::from(e)
                }
            })?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    /// Soft-delete: the account stays on record but stops matching any
    /// active-only lookup.
    pub async fn deactivate_user(&self, user_id: &Uuid) -> Result<(), AppError> {
        let client = self.get_client().await?;

        client
            .execute("UPDATE users SET active = false WHERE id = $1", &[user_id])
            .await?;

        Ok(())
    }

    /// List users through the generic query builder. Inactive accounts are
    /// excluded by an explicit default filter.
    pub async fn list_users(&self, query: &Query) -> Result<Vec<serde_json::Value>, AppError> {
        let query = query
            .clone()
            .with_default_filters(vec![FilterCondition::eq("active", FilterValue::Bool(true))]);
        self.run_select(&query.to_select("users", USER_PUBLIC_COLUMNS)).await
    }

    /// List tours through the generic query builder. Secret tours are
    /// excluded by an explicit default filter.
    pub async fn list_tours(&self, query: &Query) -> Result<Vec<serde_json::Value>, AppError> {
        let query = query.clone().with_default_filters(vec![FilterCondition::eq(
            "secret_tour",
            FilterValue::Bool(false),
        )]);
        self.run_select(&query.to_select("tours", TOUR_PUBLIC_COLUMNS)).await
    }

    async fn run_select(
        &self,
        select: &crate::query::SqlSelect,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let client = self.get_client().await?;
        let rows = client.query(&select.text, &select.param_refs()).await?;
        rows.iter().map(Self::row_to_json).collect()
    }

    pub async fn create_tour(&self, req: &CreateTourRequest) -> Result<Tour, AppError> {
        let client = self.get_client().await?;
        let slug = slugify(&req.name);

        let row = client
            .query_one(
                &format!(
                    "INSERT INTO tours \
                     (name, slug, duration, max_group_size, difficulty, price, \
                      summary, description, image_cover, secret_tour) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
                    TOUR_COLUMNS
                ),
                &[
                    &req.name,
                    &slug,
                    &req.duration,
                    &req.max_group_size,
                    &req.difficulty,
                    &req.price,
                    &req.summary,
                    &req.description,
                    &req.image_cover,
                    &req.secret_tour,
                ],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    AppError::validation("A tour with this name already exists")
                } else if e.code() == Some(&SqlState::CHECK_VIOLATION) {
                    AppError::validation("Difficulty is either easy, medium or difficult")
                } else {
                    AppError::from(e)
                }
            })?;

        Ok(Self::row_to_tour(&row))
    }

    pub async fn get_tour(&self, id: &Uuid) -> Result<Option<Tour>, AppError> {
        let client = self.get_client().await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM tours WHERE id = $1 AND secret_tour = false",
                    TOUR_COLUMNS
                ),
                &[id],
            )
            .await?;

        Ok(row.map(|r| Self::row_to_tour(&r)))
    }

    pub async fn update_tour(
        &self,
        id: &Uuid,
        req: &UpdateTourRequest,
    ) -> Result<Option<Tour>, AppError> {
        let client = self.get_client().await?;
        let slug = req.name.as_deref().map(slugify);

        let row = client
            .query_opt(
                &format!(
                    "UPDATE tours SET \
                     name = COALESCE($2, name), \
                     slug = COALESCE($3, slug), \
                     duration = COALESCE($4, duration), \
                     max_group_size = COALESCE($5, max_group_size), \
                     difficulty = COALESCE($6, difficulty), \
                     price = COALESCE($7, price), \
                     summary = COALESCE($8, summary), \
                     description = COALESCE($9, description), \
                     image_cover = COALESCE($10, image_cover), \
                     secret_tour = COALESCE($11, secret_tour) \
                     WHERE id = $1 RETURNING {}",
                    TOUR_COLUMNS
                ),
                &[
                    id,
                    &req.name,
                    &slug,
                    &req.duration,
                    &req.max_group_size,
                    &req.difficulty,
                    &req.price,
                    &req.summary,
                    &req.description,
                    &req.image_cover,
                    &req.secret_tour,
                ],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::CHECK_VIOLATION) {
                    AppError::validation("Difficulty is either easy, medium or difficult")
                } else {
                    AppError::from(e)
                }
            })?;

        Ok(row.map(|r| Self::row_to_tour(&r)))
    }

    pub async fn delete_tour(&self, id: &Uuid) -> Result<bool, AppError> {
        let client = self.get_client().await?;
        let affected = client.execute("DELETE FROM tours WHERE id = $1", &[id]).await?;
        Ok(affected > 0)
    }

    /// Helper to convert database row to User
    fn row_to_user(row: &tokio_postgres::Row) -> User {
        User {
            id: row.get(0),
            name: row.get(1),
            email: row.get(2),
            photo: row.get(3),
            role: Role::from_str(row.get::<_, &str>(4)),
            password_hash: row.get(5),
            active: row.get(6),
            password_changed_at: row.get(7),
            password_reset_token: row.get(8),
            password_reset_expires: row.get(9),
            created_at: row.get(10),
        }
    }

    /// Helper to convert database row to Tour
    fn row_to_tour(row: &tokio_postgres::Row) -> Tour {
        Tour {
            id: row.get(0),
            name: row.get(1),
            slug: row.get(2),
            duration: row.get(3),
            max_group_size: row.get(4),
            difficulty: row.get(5),
            ratings_average: row.get(6),
            ratings_quantity: row.get(7),
            price: row.get(8),
            summary: row.get(9),
            description: row.get(10),
            image_cover: row.get(11),
            secret_tour: row.get(12),
            created_at: row.get(13),
        }
    }

    /// Convert an arbitrary projected row to JSON; list endpoints cannot
    /// assume a fixed struct once the client picks its own fields.
    fn row_to_json(row: &tokio_postgres::Row) -> Result<serde_json::Value, AppError> {
        let mut object = serde_json::Map::new();
        for (i, column) in row.columns().iter().enumerate() {
            let ty = column.type_();
            let value = if *ty == Type::BOOL {
                row.try_get::<_, Option<bool>>(i)?.map(serde_json::Value::from)
            } else if *ty == Type::INT8 {
                row.try_get::<_, Option<i64>>(i)?.map(serde_json::Value::from)
            } else if *ty == Type::INT4 {
                row.try_get::<_, Option<i32>>(i)?.map(serde_json::Value::from)
            } else if *ty == Type::FLOAT8 {
                row.try_get::<_, Option<f64>>(i)?.map(serde_json::Value::from)
            } else if *ty == Type::UUID {
                row.try_get::<_, Option<Uuid>>(i)?
                    .map(|u| serde_json::Value::from(u.to_string()))
            } else if *ty == Type::TIMESTAMPTZ {
                row.try_get::<_, Option<DateTime<Utc>>>(i)?
                    .map(|t| serde_json::Value::from(t.to_rfc3339()))
            } else {
                row.try_get::<_, Option<String>>(i)?.map(serde_json::Value::from)
            };
            object.insert(column.name().to_string(), value.unwrap_or(serde_json::Value::Null));
        }
        Ok(serde_json::Value::Object(object))
    }
}

/// Lowercase, alphanumerics kept, everything else collapsed to hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
