//! PostgreSQL storage backend.

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use toolkit_types::{
    Category, DEMO_ID_MAX, Module, ModuleId, ModuleUpdate, NewModule, ProfileUpdate, UserId,
};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::traits::{ToolkitStorage, validate_new_module, validate_new_user};
use crate::types::{InstallRelation, ModuleFilter, NewUser, UserRecord};

type Manager = PostgresConnectionManager<NoTls>;

const MODULE_COLUMNS: &str =
    "id, name, description, category, content, tags, downloads, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

fn schema() -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Ids up to {demo_max} belong to the client's built-in demo catalog
CREATE SEQUENCE IF NOT EXISTS modules_id_seq START WITH {first_id} MINVALUE {first_id};

CREATE TABLE IF NOT EXISTS modules (
    id BIGINT PRIMARY KEY DEFAULT nextval('modules_id_seq'),
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    content TEXT NOT NULL,
    tags TEXT[] NOT NULL DEFAULT '{{}}',
    downloads BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS user_modules (
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    module_id BIGINT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
    installed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, module_id)
);
"#,
        demo_max = DEMO_ID_MAX,
        first_id = DEMO_ID_MAX + 1,
    )
}

/// Storage backend on a pooled PostgreSQL connection.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: Pool<Manager>,
}

impl PostgresStorage {
    /// Connect to `url` and create the schema if it is missing.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let manager = PostgresConnectionManager::new_from_stringlike(url, NoTls)
            .map_err(StorageError::backend)?;
        let pool = Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .await
            .map_err(StorageError::backend)?;

        let storage = Self { pool };
        storage.migrate().await?;
        info!("Connected to PostgreSQL");
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.batch_execute(&schema())
            .await
            .map_err(StorageError::backend)?;
        debug!("Schema is up to date");
        Ok(())
    }

    async fn conn(&self) -> Result<PooledConnection<'_, Manager>> {
        self.pool.get().await.map_err(StorageError::backend)
    }
}

fn unique_violation(err: &tokio_postgres::Error) -> Option<&str> {
    let db = err.as_db_error()?;
    if db.code() == &SqlState::UNIQUE_VIOLATION {
        db.constraint()
    } else {
        None
    }
}

fn on_unique(
    err: tokio_postgres::Error,
    conflict: impl FnOnce(&str) -> StorageError,
) -> StorageError {
    if let Some(constraint) = unique_violation(&err) {
        return conflict(constraint);
    }
    StorageError::backend(err)
}

fn module_from_row(row: &Row) -> Result<Module> {
    let category: String = row.try_get("category").map_err(StorageError::backend)?;
    let category = category
        .parse::<Category>()
        .map_err(|e| StorageError::DataConversionError {
            message: "Unknown category in modules table".to_string(),
            source: Some(eyre::eyre!(e)),
        })?;

    Ok(Module {
        id: ModuleId(row.try_get("id").map_err(StorageError::backend)?),
        name: row.try_get("name").map_err(StorageError::backend)?,
        description: row.try_get("description").map_err(StorageError::backend)?,
        category,
        content: row.try_get("content").map_err(StorageError::backend)?,
        tags: row.try_get("tags").map_err(StorageError::backend)?,
        downloads: row.try_get("downloads").map_err(StorageError::backend)?,
        created_at: row.try_get("created_at").map_err(StorageError::backend)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::backend)?,
    })
}

fn user_from_row(row: &Row) -> Result<UserRecord> {
    Ok(UserRecord {
        id: UserId(row.try_get("id").map_err(StorageError::backend)?),
        username: row.try_get("username").map_err(StorageError::backend)?,
        email: row.try_get("email").map_err(StorageError::backend)?,
        password_hash: row.try_get("password_hash").map_err(StorageError::backend)?,
        created_at: row.try_get("created_at").map_err(StorageError::backend)?,
        updated_at: row.try_get("updated_at").map_err(StorageError::backend)?,
    })
}

fn user_conflict(constraint: &str) -> StorageError {
    if constraint.contains("email") {
        StorageError::UserAlreadyExists { field: "email" }
    } else {
        StorageError::UserAlreadyExists { field: "username" }
    }
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl ToolkitStorage for PostgresStorage {
    async fn list_modules(&self, filter: &ModuleFilter) -> Result<Vec<Module>> {
        let conn = self.conn().await?;
        let category: Option<&str> = filter.category.map(|c| c.as_str());
        let text: Option<&str> = filter.text.as_deref();
        let pattern: Option<String> = filter
            .text
            .as_deref()
            .map(|t| format!("%{}%", escape_like(t)));

        let sql = format!(
            "SELECT {MODULE_COLUMNS} FROM modules \
             WHERE ($1::text IS NULL OR category = $1) \
               AND ($2::text IS NULL OR name ILIKE $3 OR description ILIKE $3 OR $2 = ANY(tags)) \
             ORDER BY downloads DESC, id ASC"
        );
        let rows = conn
            .query(&sql, &[&category, &text, &pattern])
            .await
            .map_err(StorageError::backend)?;
        rows.iter().map(module_from_row).collect()
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = $1");
        let row = conn
            .query_opt(&sql, &[&id.0])
            .await
            .map_err(StorageError::backend)?;
        row.as_ref().map(module_from_row).transpose()
    }

    async fn create_module(&self, module: &NewModule) -> Result<Module> {
        self.seed_module(module, 0).await
    }

    async fn seed_module(&self, module: &NewModule, downloads: i64) -> Result<Module> {
        validate_new_module(module)?;

        let conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO modules (name, description, category, content, tags, downloads) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MODULE_COLUMNS}"
        );
        let row = conn
            .query_one(
                &sql,
                &[
                    &module.name,
                    &module.description,
                    &module.category.as_str(),
                    &module.content,
                    &module.tags,
                    &downloads,
                ],
            )
            .await
            .map_err(|e| {
                on_unique(e, |_| StorageError::ModuleAlreadyExists {
                    name: module.name.clone(),
                })
            })?;
        module_from_row(&row)
    }

    async fn update_module(&self, id: ModuleId, update: &ModuleUpdate) -> Result<Module> {
        let conn = self.conn().await?;
        let sql = format!(
            "UPDATE modules SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               category = COALESCE($4, category), \
               content = COALESCE($5, content), \
               tags = COALESCE($6, tags), \
               updated_at = now() \
             WHERE id = $1 RETURNING {MODULE_COLUMNS}"
        );
        let category: Option<&str> = update.category.map(|c| c.as_str());
        let row = conn
            .query_opt(
                &sql,
                &[
                    &id.0,
                    &update.name,
                    &update.description,
                    &category,
                    &update.content,
                    &update.tags,
                ],
            )
            .await
            .map_err(|e| {
                on_unique(e, |_| StorageError::ModuleAlreadyExists {
                    name: update.name.clone().unwrap_or_default(),
                })
            })?;

        match row {
            Some(row) => module_from_row(&row),
            None => Err(StorageError::ModuleNotFound { id }),
        }
    }

    async fn delete_module(&self, id: ModuleId) -> Result<bool> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(StorageError::backend)?;
        tx.execute("DELETE FROM user_modules WHERE module_id = $1", &[&id.0])
            .await
            .map_err(StorageError::backend)?;
        let deleted = tx
            .execute("DELETE FROM modules WHERE id = $1", &[&id.0])
            .await
            .map_err(StorageError::backend)?;
        tx.commit().await.map_err(StorageError::backend)?;
        Ok(deleted > 0)
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord> {
        validate_new_user(user)?;

        let conn = self.conn().await?;
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        let row = conn
            .query_one(&sql, &[&user.username, &user.email, &user.password_hash])
            .await
            .map_err(|e| on_unique(e, user_conflict))?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = conn
            .query_opt(&sql, &[&id.0])
            .await
            .map_err(StorageError::backend)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = conn
            .query_opt(&sql, &[&username])
            .await
            .map_err(StorageError::backend)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<UserRecord> {
        let conn = self.conn().await?;
        let sql = format!(
            "UPDATE users SET \
               username = COALESCE($2, username), \
               email = COALESCE($3, email), \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = conn
            .query_opt(&sql, &[&id.0, &update.username, &update.email])
            .await
            .map_err(|e| on_unique(e, user_conflict))?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(StorageError::UserNotFound { id }),
        }
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let conn = self.conn().await?;
        let updated = conn
            .execute(
                "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
                &[&id.0, &password_hash],
            )
            .await
            .map_err(StorageError::backend)?;
        if updated == 0 {
            return Err(StorageError::UserNotFound { id });
        }
        Ok(())
    }

    async fn install_module(&self, user: UserId, module: ModuleId) -> Result<InstallRelation> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await.map_err(StorageError::backend)?;

        let exists = tx
            .query_opt("SELECT id FROM modules WHERE id = $1 FOR UPDATE", &[&module.0])
            .await
            .map_err(StorageError::backend)?;
        if exists.is_none() {
            return Err(StorageError::ModuleNotFound { id: module });
        }

        // The primary key makes a concurrent duplicate insert a no-op.
        let inserted = tx
            .query_opt(
                "INSERT INTO user_modules (user_id, module_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING RETURNING installed_at",
                &[&user.0, &module.0],
            )
            .await
            .map_err(StorageError::backend)?;
        let Some(row) = inserted else {
            return Err(StorageError::AlreadyInstalled {
                user_id: user,
                module_id: module,
            });
        };

        tx.execute(
            "UPDATE modules SET downloads = downloads + 1 WHERE id = $1",
            &[&module.0],
        )
        .await
        .map_err(StorageError::backend)?;
        tx.commit().await.map_err(StorageError::backend)?;

        Ok(InstallRelation {
            user_id: user,
            module_id: module,
            installed_at: row.try_get("installed_at").map_err(StorageError::backend)?,
        })
    }

    async fn uninstall_module(&self, user: UserId, module: ModuleId) -> Result<()> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM user_modules WHERE user_id = $1 AND module_id = $2",
                &[&user.0, &module.0],
            )
            .await
            .map_err(StorageError::backend)?;
        if deleted == 0 {
            return Err(StorageError::NotInstalled {
                user_id: user,
                module_id: module,
            });
        }
        Ok(())
    }

    async fn installed_module_ids(&self, user: UserId) -> Result<Vec<ModuleId>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT module_id FROM user_modules WHERE user_id = $1 \
                 ORDER BY installed_at, module_id",
                &[&user.0],
            )
            .await
            .map_err(StorageError::backend)?;
        rows.iter()
            .map(|row| {
                row.try_get::<_, i64>("module_id")
                    .map(ModuleId)
                    .map_err(StorageError::backend)
            })
            .collect()
    }

    async fn installed_modules(&self, user: UserId) -> Result<Vec<Module>> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT m.id, m.name, m.description, m.category, m.content, m.tags, \
                        m.downloads, m.created_at, m.updated_at \
                 FROM user_modules um JOIN modules m ON m.id = um.module_id \
                 WHERE um.user_id = $1 ORDER BY um.installed_at, um.module_id",
                &[&user.0],
            )
            .await
            .map_err(StorageError::backend)?;
        rows.iter().map(module_from_row).collect()
    }
}
