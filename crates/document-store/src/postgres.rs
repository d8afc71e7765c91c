use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    Document, DocumentKey, DocumentQuery, Result, StoreError, Version,
    store::{DocumentStore, Expectation, WriteBatch, validate_batch},
};

/// PostgreSQL-backed document store implementation.
///
/// Each batch runs in one transaction. Inserts use `ON CONFLICT DO NOTHING`
/// and updates are conditioned on the expected version, so a lost race shows
/// up as zero affected rows and the transaction is rolled back.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store backed by a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            key: DocumentKey::new(
                row.try_get::<String, _>("collection")?,
                row.try_get::<String, _>("id")?,
            ),
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn current_version(conn: &mut PgConnection, key: &DocumentKey) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE collection = $1 AND id = $2")
                .bind(&key.collection)
                .bind(&key.id)
                .fetch_optional(conn)
                .await?;
        Ok(version.map(Version::new))
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT collection, id, version, body, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(&key.collection)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn get_many(&self, keys: &[DocumentKey]) -> Result<Vec<Document>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let collections: Vec<String> = keys.iter().map(|k| k.collection.clone()).collect();
        let ids: Vec<String> = keys.iter().map(|k| k.id.clone()).collect();

        let rows = sqlx::query(
            r#"
            SELECT d.collection, d.id, d.version, d.body, d.updated_at
            FROM documents d
            JOIN UNNEST($1::text[], $2::text[]) AS k(collection, id)
              ON d.collection = k.collection AND d.id = k.id
            "#,
        )
        .bind(&collections)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let (field, value) = match query.field_equals {
            Some((field, value)) => (Some(field), Some(value)),
            None => (None, None),
        };

        let rows = sqlx::query(
            r#"
            SELECT collection, id, version, body, updated_at
            FROM documents
            WHERE collection = $1
              AND ($2::text IS NULL OR body @> jsonb_build_object($2::text, $3::jsonb))
            ORDER BY id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&query.collection)
        .bind(field)
        .bind(value)
        .bind(query.limit.map(|l| l as i64))
        .bind(query.offset.unwrap_or(0) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<Version>> {
        validate_batch(&batch)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut versions = Vec::with_capacity(batch.len());

        for write in batch.writes() {
            let result = match write.expectation {
                Expectation::New => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, version, body, updated_at)
                        VALUES ($1, $2, 1, $3, $4)
                        ON CONFLICT (collection, id) DO NOTHING
                        "#,
                    )
                    .bind(&write.key.collection)
                    .bind(&write.key.id)
                    .bind(&write.body)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?
                }
                Expectation::Version(expected) => {
                    sqlx::query(
                        r#"
                        UPDATE documents
                        SET body = $3, version = version + 1, updated_at = $4
                        WHERE collection = $1 AND id = $2 AND version = $5
                        "#,
                    )
                    .bind(&write.key.collection)
                    .bind(&write.key.id)
                    .bind(&write.body)
                    .bind(now)
                    .bind(expected.as_i64())
                    .execute(&mut *tx)
                    .await?
                }
            };

            if result.rows_affected() == 0 {
                let actual = Self::current_version(&mut *tx, &write.key).await?;
                tracing::debug!(key = %write.key, expected = %write.expectation, "write lost race");
                // Dropping the transaction rolls back earlier writes in the batch
                return Err(StoreError::ConcurrencyConflict {
                    key: write.key.clone(),
                    expected: write.expectation.to_string(),
                    actual,
                });
            }

            versions.push(write.expectation.next_version());
        }

        tx.commit().await?;
        metrics::counter!("document_store_commits_total").increment(1);
        Ok(versions)
    }
}
