//! PostgreSQL chain store with connection pooling

use std::fmt::Debug;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::chain::{ChainDefinition, ChainId, ChainStore};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Table holding chain documents
    pub table_name: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/chainport".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            table_name: "chains".to_string(),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }
}

/// Chain documents stored as JSONB rows keyed by `(owner_id, chain_id)`
pub struct PostgresChainStore {
    pool: PgPool,
    table_name: String,
}

impl Debug for PostgresChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresChainStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresChainStore {
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Connect a pool and make sure the table exists
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let store = Self::new(pool, config.table_name.clone());
        store.ensure_table().await?;

        Ok(store)
    }

    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                owner_id VARCHAR(255) NOT NULL,
                chain_id VARCHAR(128) NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (owner_id, chain_id)
            )
            "#,
            table = self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_chain_id ON {table} (chain_id)",
            table = self.table_name
        );

        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    /// Stored documents are never overwritten
    fn insert_query(&self) -> String {
        format!(
            r#"
            INSERT INTO {} (owner_id, chain_id, data, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id, chain_id) DO NOTHING
            "#,
            self.table_name
        )
    }

    fn decode(row: &PgRow) -> Result<ChainDefinition, DomainError> {
        let data: serde_json::Value = row
            .try_get("data")
            .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?;

        serde_json::from_value(data)
            .map_err(|e| DomainError::storage(format!("Failed to deserialize chain: {}", e)))
    }

    async fn fetch_one(
        &self,
        query: &str,
        binds: &[&str],
    ) -> Result<Option<ChainDefinition>, DomainError> {
        let mut q = sqlx::query(query);
        for value in binds {
            q = q.bind(*value);
        }

        let row = q
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get chain: {}", e)))?;

        row.as_ref().map(Self::decode).transpose()
    }
}

#[async_trait]
impl ChainStore for PostgresChainStore {
    async fn put(&self, chain: &ChainDefinition) -> Result<(), DomainError> {
        let data = serde_json::to_value(chain)
            .map_err(|e| DomainError::storage(format!("Failed to serialize chain: {}", e)))?;

        sqlx::query(&self.insert_query())
            .bind(chain.owner_id())
            .bind(chain.id().as_str())
            .bind(&data)
            .bind(chain.created_at())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to store chain: {}", e)))?;

        Ok(())
    }

    async fn get(
        &self,
        owner_id: &str,
        id: &ChainId,
    ) -> Result<Option<ChainDefinition>, DomainError> {
        let query = format!(
            "SELECT data FROM {} WHERE owner_id = $1 AND chain_id = $2",
            self.table_name
        );

        self.fetch_one(&query, &[owner_id, id.as_str()]).await
    }

    async fn list_owners(&self) -> Result<Vec<String>, DomainError> {
        let query = format!("SELECT DISTINCT owner_id FROM {}", self.table_name);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list owners: {}", e)))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("owner_id")
                    .map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))
            })
            .collect()
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ChainDefinition>, DomainError> {
        let query = format!(
            "SELECT data FROM {} WHERE owner_id = $1 ORDER BY created_at DESC",
            self.table_name
        );

        let rows = sqlx::query(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list chains: {}", e)))?;

        rows.iter().map(Self::decode).collect()
    }

    async fn find(&self, id: &ChainId) -> Result<Option<ChainDefinition>, DomainError> {
        let query = format!(
            "SELECT data FROM {} WHERE chain_id = $1 LIMIT 1",
            self.table_name
        );

        self.fetch_one(&query, &[id.as_str()]).await
    }

    async fn find_by_fragment(
        &self,
        fragment: &str,
    ) -> Result<Option<ChainDefinition>, DomainError> {
        // strpos keeps LIKE wildcards in the fragment literal
        let query = format!(
            "SELECT data FROM {} WHERE strpos(chain_id, $1) > 0 ORDER BY created_at LIMIT 1",
            self.table_name
        );

        self.fetch_one(&query, &[fragment]).await
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Health check failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://db/chains")
            .with_max_connections(4)
            .with_table_name("chain_documents");

        assert_eq!(config.url, "postgres://db/chains");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.table_name, "chain_documents");
    }

    #[tokio::test]
    async fn test_lazy_pool_reports_unreachable_database() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let store = PostgresChainStore::new(pool, "chains");

        let error = store.health_check().await.unwrap_err();
        assert!(matches!(error, DomainError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_insert_never_overwrites() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let query = PostgresChainStore::new(pool, "chain_documents").insert_query();

        assert!(query.contains("INSERT INTO chain_documents"));
        assert!(query.contains("DO NOTHING"));
        assert!(!query.contains("DO UPDATE"));
    }
}
