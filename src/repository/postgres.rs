//! PostgreSQL country store.
//!
//! Each country is one row: the full document lives in a JSONB column, with
//! `name`, `region` and `population` lifted out for filtering and sorting.
//! `seq` preserves insertion order for [`CountryRepository::find_all`].

use super::{CountryFilter, CountryRepository};
use crate::error::{Error, Result};
use crate::model::{Country, StoredCountry};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

type Row = (String, sqlx::types::Json<Country>, DateTime<Utc>, DateTime<Utc>);

const SELECT_COLUMNS: &str = "SELECT id, doc, created_at, updated_at FROM countries";

/// JSONB-backed document store.
#[derive(Clone)]
pub struct PgCountryStore {
    pool: PgPool,
}

impl PgCountryStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the connection or a migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Store(format!("Migration failed: {}", e)))?;

        info!("✓ Postgres store connected and migrated");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CountryFilter) {
        builder.push(" WHERE TRUE");
        if let Some(region) = &filter.region {
            builder.push(" AND region = ").push_bind(region.clone());
        }
        if let Some(min) = filter.min_population {
            builder.push(" AND population >= ").push_bind(to_i64(min));
        }
        if let Some(max) = filter.max_population {
            builder.push(" AND population <= ").push_bind(to_i64(max));
        }
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn into_stored((id, doc, created_at, updated_at): Row) -> StoredCountry {
    StoredCountry {
        id,
        country: doc.0,
        created_at,
        updated_at,
    }
}

impl CountryRepository for PgCountryStore {
    async fn count(&self, filter: &CountryFilter) -> Result<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM countries");
        Self::push_filter(&mut builder, filter);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find(
        &self,
        filter: &CountryFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<StoredCountry>> {
        let mut builder = QueryBuilder::new(SELECT_COLUMNS);
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY name COLLATE \"C\" ASC, seq ASC LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(skip));

        let rows: Vec<Row> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(into_stored).collect())
    }

    async fn find_one_by_name(&self, name: &str) -> Result<Option<StoredCountry>> {
        let row: Option<Row> = sqlx::query_as(&format!(
            "{} WHERE name = $1 ORDER BY seq LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_stored))
    }

    async fn find_all(&self) -> Result<Vec<StoredCountry>> {
        let rows: Vec<Row> = sqlx::query_as(&format!("{} ORDER BY seq", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(into_stored).collect())
    }

    async fn delete_all(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM countries")
            .execute(&self.pool)
            .await?;
        debug!("✓ Postgres DELETE ALL ({} rows)", result.rows_affected());
        Ok(())
    }

    async fn insert_many(&self, countries: Vec<Country>) -> Result<Vec<StoredCountry>> {
        let inserted: Vec<StoredCountry> = countries.into_iter().map(StoredCountry::new).collect();

        let mut tx = self.pool.begin().await?;
        for doc in &inserted {
            sqlx::query(
                r#"
                INSERT INTO countries (id, name, region, population, doc, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&doc.id)
            .bind(&doc.name)
            .bind(&doc.region)
            .bind(to_i64(doc.population))
            .bind(sqlx::types::Json(&doc.country))
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!("✓ Postgres INSERT {} rows", inserted.len());
        Ok(inserted)
    }

    async fn health_check(&self) -> Result<bool> {
        let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }
}
