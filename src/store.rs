//! Record store client: filtered/sorted/paginated lookups over the canonical
//! entity and file tables in Postgres.
//!
//! The `RecordStore` trait is the seam the core depends on; `PgStore` is the
//! production implementation. Tests implement the trait over in-memory
//! fixtures so nothing in the core ever needs a live database.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::QueryBuilder;

use crate::error::AppError;
use crate::model::{Entity, EntitySortKey, FileRecord, FileSortKey, SortOrder};

/// Filter + sort + page parameters for entity listings. Filters are exact
/// matches; `entity_types` is an OR-list (empty means no type filter).
#[derive(Debug, Clone)]
pub struct EntityListQuery {
    pub member_of: Option<String>,
    pub entity_types: Vec<String>,
    pub limit: i64,
    pub offset: i64,
    pub sort: EntitySortKey,
    pub order: SortOrder,
}

impl Default for EntityListQuery {
    fn default() -> Self {
        EntityListQuery {
            member_of: None,
            entity_types: Vec::new(),
            limit: 10,
            offset: 0,
            sort: EntitySortKey::Id,
            order: SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileListQuery {
    pub member_of: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub sort: FileSortKey,
    pub order: SortOrder,
}

impl Default for FileListQuery {
    fn default() -> Self {
        FileListQuery {
            member_of: None,
            limit: 10,
            offset: 0,
            sort: FileSortKey::Id,
            order: SortOrder::Asc,
        }
    }
}

/// The store operations the core consumes. Records are read-only from this
/// side; ingestion writes them elsewhere.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, AppError>;
    async fn list_entities(&self, q: &EntityListQuery) -> Result<Vec<Entity>, AppError>;
    async fn count_entities(&self, q: &EntityListQuery) -> Result<u64, AppError>;
    /// Batched lookup keyed by identifier. Ids with no record are simply
    /// absent from the result; order is not significant.
    async fn entities_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>, AppError>;
    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>, AppError>;
    async fn list_files(&self, q: &FileListQuery) -> Result<Vec<FileRecord>, AppError>;
    async fn count_files(&self, q: &FileListQuery) -> Result<u64, AppError>;
    async fn ping(&self) -> Result<(), AppError>;
}

const ENTITY_COLUMNS: &str = "pk, id, name, description, entity_type, member_of, root_collection, metadata_license_id, content_license_id, meta, created_at, updated_at";
const FILE_COLUMNS: &str = "pk, id, filename, media_type, size, member_of, root_collection, content_license_id, meta, created_at, updated_at";

/// Sort keys map to fixed column names; user input never reaches the SQL text.
fn entity_sort_column(key: EntitySortKey) -> &'static str {
    match key {
        EntitySortKey::Id => "id",
        EntitySortKey::Name => "name",
        EntitySortKey::CreatedAt => "created_at",
        EntitySortKey::UpdatedAt => "updated_at",
    }
}

fn file_sort_column(key: FileSortKey) -> &'static str {
    match key {
        FileSortKey::Id => "id",
        FileSortKey::Filename => "filename",
        FileSortKey::CreatedAt => "created_at",
        FileSortKey::UpdatedAt => "updated_at",
    }
}

fn entity_filter_clauses(qb: &mut QueryBuilder<'_, Postgres>, q: &EntityListQuery) {
    if let Some(member_of) = &q.member_of {
        qb.push(" AND member_of = ").push_bind(member_of.clone());
    }
    if !q.entity_types.is_empty() {
        qb.push(" AND entity_type = ANY(").push_bind(q.entity_types.clone()).push(")");
    }
}

fn file_filter_clauses(qb: &mut QueryBuilder<'_, Postgres>, q: &FileListQuery) {
    if let Some(member_of) = &q.member_of {
        qb.push(" AND member_of = ").push_bind(member_of.clone());
    }
}

pub(crate) fn entity_list_builder(q: &EntityListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE 1=1"));
    entity_filter_clauses(&mut qb, q);
    qb.push(format!(" ORDER BY {} {}", entity_sort_column(q.sort), q.order.as_sql()));
    qb.push(" LIMIT ").push_bind(q.limit);
    qb.push(" OFFSET ").push_bind(q.offset);
    qb
}

pub(crate) fn entity_count_builder(q: &EntityListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM entities WHERE 1=1");
    entity_filter_clauses(&mut qb, q);
    qb
}

pub(crate) fn file_list_builder(q: &FileListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files WHERE 1=1"));
    file_filter_clauses(&mut qb, q);
    qb.push(format!(" ORDER BY {} {}", file_sort_column(q.sort), q.order.as_sql()));
    qb.push(" LIMIT ").push_bind(q.limit);
    qb.push(" OFFSET ").push_bind(q.offset);
    qb
}

pub(crate) fn file_count_builder(q: &FileListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM files WHERE 1=1");
    file_filter_clauses(&mut qb, q);
    qb
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Connect a pool once at startup; reuse is the pool's job.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(PgStore { pool })
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, AppError> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = $1");
        let row = sqlx::query_as::<_, Entity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_entities(&self, q: &EntityListQuery) -> Result<Vec<Entity>, AppError> {
        let mut qb = entity_list_builder(q);
        let rows = qb.build_query_as::<Entity>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count_entities(&self, q: &EntityListQuery) -> Result<u64, AppError> {
        let mut qb = entity_count_builder(q);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn entities_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, Entity>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>, AppError> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1");
        let row = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_files(&self, q: &FileListQuery) -> Result<Vec<FileRecord>, AppError> {
        let mut qb = file_list_builder(q);
        let rows = qb.build_query_as::<FileRecord>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count_files(&self, q: &FileListQuery) -> Result<u64, AppError> {
        let mut qb = file_count_builder(q);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
