use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::entities::item::{FileContent, Item, ItemContent, ItemKind};
use crate::domain::repositories::item_repository::{
    ItemOrder, ItemQuery, ItemRepository, ItemRepositoryError, ItemRepositoryResult, ParentFilter,
    TrashFilter,
};

const COLUMNS: &str = "id, owner_id, parent_id, name, kind, blob_key, mime_hint, size_bytes, \
                       is_starred, is_trashed, trashed_at, created_at, updated_at";

fn trash_clause(filter: TrashFilter) -> &'static str {
    match filter {
        TrashFilter::Exclude => " AND is_trashed = FALSE",
        TrashFilter::Only => " AND is_trashed = TRUE",
        TrashFilter::Any => "",
    }
}

fn order_clause(order: ItemOrder) -> &'static str {
    match order {
        // "C" collation so names sort by code point, as in memory
        ItemOrder::KindThenName => " ORDER BY (kind = 'folder') DESC, name COLLATE \"C\" ASC",
        ItemOrder::UpdatedDesc => " ORDER BY updated_at DESC, id ASC",
        ItemOrder::TrashedDesc => " ORDER BY trashed_at DESC NULLS LAST, id ASC",
    }
}

/// SELECT for an owner-scoped listing; every filter of the query ends up here
fn listing_builder(query: &ItemQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM drive.items WHERE owner_id = ", COLUMNS));
    builder.push_bind(query.owner_id);

    match query.parent {
        ParentFilter::Any => {}
        ParentFilter::Root => {
            builder.push(" AND parent_id IS NULL");
        }
        ParentFilter::Folder(parent_id) => {
            builder.push(" AND parent_id = ");
            builder.push_bind(parent_id);
        }
    }

    builder.push(trash_clause(query.trash));

    if let Some(starred) = query.starred {
        builder.push(" AND is_starred = ");
        builder.push_bind(starred);
    }
    if let Some(kind) = query.kind {
        builder.push(" AND kind = ");
        builder.push_bind(kind.as_str());
    }

    builder.push(order_clause(query.order));

    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    builder
}

/// Repositorio PostgreSQL de items (tabla `drive.items`).
///
/// State transitions are single conditional statements, so the check and
/// the write cannot be separated by a concurrent request.
pub struct ItemPgRepository {
    pool: Arc<PgPool>,
}

impl ItemPgRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    // Método auxiliar para mapear errores SQL a errores de dominio
    fn map_sqlx_error(err: sqlx::Error) -> ItemRepositoryError {
        match err {
            sqlx::Error::Database(db_err) => {
                if db_err.code().map_or(false, |code| code == "23505") {
                    // Código para violación de unicidad en PostgreSQL
                    ItemRepositoryError::AlreadyExists(db_err.to_string())
                } else {
                    ItemRepositoryError::DatabaseError(format!("Error de base de datos: {}", db_err))
                }
            }
            _ => ItemRepositoryError::DatabaseError(format!("Error de base de datos: {}", err)),
        }
    }

    fn row_to_item(row: &PgRow) -> ItemRepositoryResult<Item> {
        let id: Uuid = row.try_get("id").map_err(Self::map_sqlx_error)?;
        let kind_str: String = row.try_get("kind").map_err(Self::map_sqlx_error)?;

        let kind = ItemKind::parse(&kind_str).ok_or_else(|| {
            ItemRepositoryError::CorruptedRecord(format!("item {} has unknown kind {:?}", id, kind_str))
        })?;

        let content = match kind {
            ItemKind::Folder => ItemContent::Folder,
            ItemKind::File => {
                let blob_key: Option<String> = row.try_get("blob_key").map_err(Self::map_sqlx_error)?;
                let mime_hint: Option<String> = row.try_get("mime_hint").map_err(Self::map_sqlx_error)?;
                let size_bytes: Option<i64> = row.try_get("size_bytes").map_err(Self::map_sqlx_error)?;

                let file = FileContent::new(
                    blob_key.unwrap_or_default(),
                    mime_hint,
                    size_bytes.and_then(|size| u64::try_from(size).ok()),
                )
                .map_err(|e| ItemRepositoryError::CorruptedRecord(format!("item {}: {}", id, e)))?;
                ItemContent::File(file)
            }
        };

        Ok(Item::from_record(
            id,
            row.try_get("name").map_err(Self::map_sqlx_error)?,
            content,
            row.try_get("parent_id").map_err(Self::map_sqlx_error)?,
            row.try_get("owner_id").map_err(Self::map_sqlx_error)?,
            row.try_get("is_starred").map_err(Self::map_sqlx_error)?,
            row.try_get("is_trashed").map_err(Self::map_sqlx_error)?,
            row.try_get("trashed_at").map_err(Self::map_sqlx_error)?,
            row.try_get("created_at").map_err(Self::map_sqlx_error)?,
            row.try_get("updated_at").map_err(Self::map_sqlx_error)?,
        ))
    }

    fn rows_to_items(rows: &[PgRow]) -> ItemRepositoryResult<Vec<Item>> {
        rows.iter().map(Self::row_to_item).collect()
    }

    fn size_column(item: &Item) -> Option<i64> {
        item.size_bytes().and_then(|size| i64::try_from(size).ok())
    }

    async fn insert<'e, E>(executor: E, item: &Item) -> ItemRepositoryResult<()>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO drive.items (
                id, owner_id, parent_id, name, kind, blob_key, mime_hint, size_bytes,
                is_starred, is_trashed, trashed_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
            )
            "#,
        )
        .bind(item.id())
        .bind(item.owner_id())
        .bind(item.parent_id())
        .bind(item.name())
        .bind(item.kind().as_str())
        .bind(item.blob_key())
        .bind(item.mime_hint())
        .bind(Self::size_column(item))
        .bind(item.is_starred())
        .bind(item.is_trashed())
        .bind(item.trashed_at())
        .bind(item.created_at())
        .bind(item.updated_at())
        .execute(executor)
        .await
        .map_err(Self::map_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl ItemRepository for ItemPgRepository {
    async fn create(&self, item: &Item) -> ItemRepositoryResult<()> {
        Self::insert(&*self.pool, item).await
    }

    /// Todos los items en una única transacción
    async fn create_many(&self, items: &[Item]) -> ItemRepositoryResult<()> {
        let mut tx = self.pool.begin().await.map_err(Self::map_sqlx_error)?;

        for item in items {
            // Dropping the transaction on error rolls it back
            Self::insert(&mut *tx, item).await?;
        }

        tx.commit().await.map_err(Self::map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<Option<Item>> {
        let sql = format!(
            "SELECT {} FROM drive.items WHERE id = $1 AND owner_id = $2{}",
            COLUMNS,
            trash_clause(trash)
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn find_by_owner(&self, query: &ItemQuery) -> ItemRepositoryResult<Vec<Item>> {
        let mut builder = listing_builder(query);

        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        Self::rows_to_items(&rows)
    }

    async fn rename(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        name: &str,
    ) -> ItemRepositoryResult<Option<Item>> {
        let sql = format!(
            r#"
            UPDATE drive.items
            SET name = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn toggle_star(&self, id: &Uuid, owner_id: &Uuid) -> ItemRepositoryResult<Option<Item>> {
        // The flip reads the stored value, so concurrent toggles never collapse
        let sql = format!(
            r#"
            UPDATE drive.items
            SET is_starred = NOT is_starred, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn mark_trashed(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        at: DateTime<Utc>,
    ) -> ItemRepositoryResult<Option<Item>> {
        let sql = format!(
            r#"
            UPDATE drive.items
            SET is_trashed = TRUE, trashed_at = $3, updated_at = $3
            WHERE id = $1 AND owner_id = $2 AND is_trashed = FALSE
            RETURNING {}
            "#,
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn mark_restored(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        detach: bool,
    ) -> ItemRepositoryResult<Option<Item>> {
        let sql = format!(
            r#"
            UPDATE drive.items
            SET is_trashed = FALSE,
                trashed_at = NULL,
                parent_id = CASE WHEN $3 THEN NULL ELSE parent_id END,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND is_trashed = TRUE
            RETURNING {}
            "#,
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(detach)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn delete_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<bool> {
        let sql = format!(
            "DELETE FROM drive.items WHERE id = $1 AND owner_id = $2{}",
            trash_clause(trash)
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner_id)
            .execute(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_trashed_before(&self, cutoff: DateTime<Utc>) -> ItemRepositoryResult<Vec<Item>> {
        let sql = format!(
            "SELECT {} FROM drive.items WHERE is_trashed = TRUE AND trashed_at <= $1",
            COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&*self.pool)
            .await
            .map_err(Self::map_sqlx_error)?;

        Self::rows_to_items(&rows)
    }
}
