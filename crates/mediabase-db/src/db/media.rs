use std::collections::{HashMap, HashSet};

use mediabase_core::models::{MediaRecord, MediaRow, MediaUpdate, NewMedia, Tag};
use mediabase_core::validation;
use mediabase_core::AppError;
use sqlx::{Executor, PgPool, Postgres, Transaction};

const MEDIA_COLUMNS: &str = "id, name, file, thumbnail, mime_type, size, width, height, \
     description, project_id, user_id, created_at, modified_at";

/// Row shape for batched tag loads: one row per (media, tag) pair.
#[derive(Debug, sqlx::FromRow)]
struct MediaTagRow {
    media_id: i32,
    id: i32,
    name: String,
}

/// Minimal add/remove diff between a stored and a desired tag id set.
///
/// The two sides are disjoint by construction: an id present in both inputs
/// lands in neither, so unchanged associations are never deleted and
/// reinserted. Duplicate ids within one input are collapsed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagDiff {
    /// Wanted but not currently associated.
    pub to_relate: Vec<i32>,
    /// Currently associated but no longer wanted.
    pub to_unrelate: Vec<i32>,
}

impl TagDiff {
    pub fn between(existing: &[i32], incoming: &[i32]) -> Self {
        let existing_set: HashSet<i32> = existing.iter().copied().collect();
        let incoming_set: HashSet<i32> = incoming.iter().copied().collect();

        let mut seen = HashSet::new();
        let to_unrelate = existing
            .iter()
            .copied()
            .filter(|id| !incoming_set.contains(id) && seen.insert(*id))
            .collect();

        seen.clear();
        let to_relate = incoming
            .iter()
            .copied()
            .filter(|id| !existing_set.contains(id) && seen.insert(*id))
            .collect();

        TagDiff {
            to_relate,
            to_unrelate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_relate.is_empty() && self.to_unrelate.is_empty()
    }
}

/// Repository for media records and their tag associations
///
/// All operations are request-scoped round-trips against the shared pool;
/// there is no caching, no retry, and no locking beyond what Postgres
/// provides. The `_tx` variants join the caller's transaction instead of
/// running as their own atomic unit.
#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a media record. Validates the write schema before any SQL is
    /// issued; `id`, `created_at`, and `modified_at` are storage-assigned.
    #[tracing::instrument(skip(self, input), fields(db.table = "media", db.operation = "insert"))]
    pub async fn create(&self, input: NewMedia) -> Result<MediaRecord, AppError> {
        validation::validate_new_media(&input)?;
        insert_media(&self.pool, &input).await
    }

    /// Create a media record within the caller's transaction.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: NewMedia,
    ) -> Result<MediaRecord, AppError> {
        validation::validate_new_media(&input)?;
        insert_media(&mut **tx, &input).await
    }

    /// Get a media record by id. Tags are not loaded here; use
    /// [`Self::get_tags`] or [`Self::list_by_project`] for that.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i32) -> Result<Option<MediaRecord>, AppError> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1");
        let row = sqlx::query_as::<Postgres, MediaRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(MediaRow::into_record))
    }

    /// Partially update a media record. Omitted fields keep their stored
    /// value; `modified_at` is refreshed. `NotFound` if the row is absent.
    #[tracing::instrument(skip(self, update), fields(db.table = "media", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: i32, update: MediaUpdate) -> Result<MediaRecord, AppError> {
        validation::validate_media_update(&update)?;
        update_media(&self.pool, id, &update).await
    }

    /// Partially update a media record within the caller's transaction.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        update: MediaUpdate,
    ) -> Result<MediaRecord, AppError> {
        validation::validate_media_update(&update)?;
        update_media(&mut **tx, id, &update).await
    }

    /// Delete a single media record. Join rows in `media_tags` go with it
    /// via the foreign-key cascade.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: i32) -> Result<bool, AppError> {
        delete_media(&self.pool, id).await
    }

    /// Delete a single media record within the caller's transaction.
    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> Result<bool, AppError> {
        delete_media(&mut **tx, id).await
    }

    /// List all media records for a project, each with its tags eagerly
    /// loaded. One batched follow-up query populates every tag list, so the
    /// caller never pays a per-record round-trip; a record without tags
    /// carries `Some(vec![])`, not `None`.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn list_by_project(&self, project_id: i32) -> Result<Vec<MediaRecord>, AppError> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE project_id = $1");
        let rows = sqlx::query_as::<Postgres, MediaRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let tag_map = load_tags_batch(&self.pool, &ids).await?;
        Ok(attach_tags(rows, tag_map))
    }

    /// List a project's media within the caller's transaction.
    pub async fn list_by_project_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: i32,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE project_id = $1");
        let rows = sqlx::query_as::<Postgres, MediaRow>(&sql)
            .bind(project_id)
            .fetch_all(&mut **tx)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let tag_map = load_tags_batch(&mut **tx, &ids).await?;
        Ok(attach_tags(rows, tag_map))
    }

    /// Delete every media record whose id is in `ids` AND whose project is
    /// `project_id`. The conjunction is a safety boundary: ids belonging to
    /// other projects are left alone. Returns the number of rows actually
    /// removed; absent ids contribute 0 rather than erroring.
    #[tracing::instrument(skip(self, ids), fields(db.table = "media", db.operation = "delete"))]
    pub async fn bulk_delete(&self, ids: &[i32], project_id: i32) -> Result<u64, AppError> {
        delete_in_project(&self.pool, ids, project_id).await
    }

    /// Bulk delete within the caller's transaction.
    pub async fn bulk_delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[i32],
        project_id: i32,
    ) -> Result<u64, AppError> {
        delete_in_project(&mut **tx, ids, project_id).await
    }

    /// Load the current tag associations for a record, straight from the
    /// join table. No cache.
    #[tracing::instrument(skip(self), fields(db.table = "media_tags", db.operation = "select", db.record_id = %media_id))]
    pub async fn get_tags(&self, media_id: i32) -> Result<Vec<Tag>, AppError> {
        select_tags(&self.pool, media_id).await
    }

    /// Load tag associations within the caller's transaction.
    pub async fn get_tags_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        media_id: i32,
    ) -> Result<Vec<Tag>, AppError> {
        select_tags(&mut **tx, media_id).await
    }

    /// Reconcile the record's stored tag associations to exactly match
    /// `incoming`, by tag id, with a minimal diff: ids in both the stored
    /// and the desired set are left untouched.
    ///
    /// The unrelate and relate writes are disjoint, so they are issued
    /// concurrently against the pool and joined before returning. That also
    /// means a failure on one side does not roll back the other; callers
    /// that need the pair to be atomic must use [`Self::set_tags_tx`]
    /// inside a transaction.
    ///
    /// Returns the caller's `incoming` vector unchanged, not a re-fetch.
    #[tracing::instrument(skip(self, incoming), fields(db.table = "media_tags", db.operation = "reconcile", db.record_id = %media_id))]
    pub async fn set_tags(&self, media_id: i32, incoming: Vec<Tag>) -> Result<Vec<Tag>, AppError> {
        ensure_media_exists(&self.pool, media_id).await?;

        let existing = select_tags(&self.pool, media_id).await?;
        let existing_ids: Vec<i32> = existing.iter().map(|tag| tag.id).collect();
        let incoming_ids: Vec<i32> = incoming.iter().map(|tag| tag.id).collect();
        let diff = TagDiff::between(&existing_ids, &incoming_ids);

        let unrelate = async {
            if diff.to_unrelate.is_empty() {
                return Ok(());
            }
            unrelate_tags(&self.pool, media_id, &diff.to_unrelate).await
        };
        let relate = async {
            if diff.to_relate.is_empty() {
                return Ok(());
            }
            relate_tags(&self.pool, media_id, &diff.to_relate).await
        };
        tokio::try_join!(unrelate, relate)?;

        Ok(incoming)
    }

    /// Reconcile tag associations within the caller's transaction. The two
    /// writes share one connection here, so they run sequentially and are
    /// visible or rolled back together with the enclosing transaction.
    pub async fn set_tags_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        media_id: i32,
        incoming: Vec<Tag>,
    ) -> Result<Vec<Tag>, AppError> {
        ensure_media_exists(&mut **tx, media_id).await?;

        let existing = select_tags(&mut **tx, media_id).await?;
        let existing_ids: Vec<i32> = existing.iter().map(|tag| tag.id).collect();
        let incoming_ids: Vec<i32> = incoming.iter().map(|tag| tag.id).collect();
        let diff = TagDiff::between(&existing_ids, &incoming_ids);

        if !diff.to_unrelate.is_empty() {
            unrelate_tags(&mut **tx, media_id, &diff.to_unrelate).await?;
        }
        if !diff.to_relate.is_empty() {
            relate_tags(&mut **tx, media_id, &diff.to_relate).await?;
        }

        Ok(incoming)
    }
}

async fn insert_media<'e, E>(executor: E, input: &NewMedia) -> Result<MediaRecord, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        INSERT INTO media (
            name, file, thumbnail, mime_type, size, width, height,
            description, project_id, user_id, created_at, modified_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
        RETURNING {MEDIA_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<Postgres, MediaRow>(&sql)
        .bind(&input.name)
        .bind(&input.file)
        .bind(&input.thumbnail)
        .bind(&input.mime_type)
        .bind(input.size)
        .bind(input.width)
        .bind(input.height)
        .bind(&input.description)
        .bind(input.project_id)
        .bind(input.user_id)
        .fetch_one(executor)
        .await?;

    Ok(row.into_record())
}

async fn update_media<'e, E>(
    executor: E,
    id: i32,
    update: &MediaUpdate,
) -> Result<MediaRecord, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        UPDATE media SET
            name = COALESCE($2, name),
            file = COALESCE($3, file),
            thumbnail = COALESCE($4, thumbnail),
            mime_type = COALESCE($5, mime_type),
            size = COALESCE($6, size),
            width = COALESCE($7, width),
            height = COALESCE($8, height),
            description = COALESCE($9, description),
            project_id = COALESCE($10, project_id),
            user_id = COALESCE($11, user_id),
            modified_at = NOW()
        WHERE id = $1
        RETURNING {MEDIA_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<Postgres, MediaRow>(&sql)
        .bind(id)
        .bind(&update.name)
        .bind(&update.file)
        .bind(&update.thumbnail)
        .bind(&update.mime_type)
        .bind(update.size)
        .bind(update.width)
        .bind(update.height)
        .bind(&update.description)
        .bind(update.project_id)
        .bind(update.user_id)
        .fetch_one(executor)
        .await?;

    Ok(row.into_record())
}

fn attach_tags(rows: Vec<MediaRow>, mut tag_map: HashMap<i32, Vec<Tag>>) -> Vec<MediaRecord> {
    rows.into_iter()
        .map(|row| {
            let mut record = row.into_record();
            record.tags = Some(tag_map.remove(&record.id).unwrap_or_default());
            record
        })
        .collect()
}

/// Fetch tags for many media rows in one query (avoids N+1 in list_by_project).
async fn load_tags_batch<'e, E>(
    executor: E,
    media_ids: &[i32],
) -> Result<HashMap<i32, Vec<Tag>>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    if media_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<Postgres, MediaTagRow>(
        r#"
        SELECT mt.media_id, t.id, t.name
        FROM media_tags mt
        JOIN tags t ON t.id = mt.tag_id
        WHERE mt.media_id = ANY($1)
        ORDER BY t.name ASC
        "#,
    )
    .bind(media_ids.to_vec())
    .fetch_all(executor)
    .await?;

    Ok(group_tags_by_media(rows))
}

fn group_tags_by_media(rows: Vec<MediaTagRow>) -> HashMap<i32, Vec<Tag>> {
    let mut map: HashMap<i32, Vec<Tag>> = HashMap::new();
    for row in rows {
        map.entry(row.media_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }
    map
}

async fn select_tags<'e, E>(executor: E, media_id: i32) -> Result<Vec<Tag>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let tags = sqlx::query_as::<Postgres, Tag>(
        r#"
        SELECT t.id, t.name
        FROM media_tags mt
        JOIN tags t ON t.id = mt.tag_id
        WHERE mt.media_id = $1
        ORDER BY t.name ASC
        "#,
    )
    .bind(media_id)
    .fetch_all(executor)
    .await?;

    Ok(tags)
}

async fn delete_media<'e, E>(executor: E, id: i32) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows_affected = sqlx::query("DELETE FROM media WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?
        .rows_affected();

    Ok(rows_affected > 0)
}

async fn delete_in_project<'e, E>(
    executor: E,
    ids: &[i32],
    project_id: i32,
) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let rows_affected = sqlx::query("DELETE FROM media WHERE id = ANY($1) AND project_id = $2")
        .bind(ids.to_vec())
        .bind(project_id)
        .execute(executor)
        .await?
        .rows_affected();

    Ok(rows_affected)
}

async fn ensure_media_exists<'e, E>(executor: E, media_id: i32) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let exists = sqlx::query_scalar::<Postgres, bool>(
        "SELECT EXISTS(SELECT 1 FROM media WHERE id = $1)",
    )
    .bind(media_id)
    .fetch_one(executor)
    .await?;

    if !exists {
        return Err(AppError::NotFound(format!("media {media_id} not found")));
    }
    Ok(())
}

async fn unrelate_tags<'e, E>(executor: E, media_id: i32, tag_ids: &[i32]) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("DELETE FROM media_tags WHERE media_id = $1 AND tag_id = ANY($2)")
        .bind(media_id)
        .bind(tag_ids.to_vec())
        .execute(executor)
        .await?;

    Ok(())
}

async fn relate_tags<'e, E>(executor: E, media_id: i32, tag_ids: &[i32]) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO media_tags (media_id, tag_id) SELECT $1, unnest($2::int4[])",
    )
    .bind(media_id)
    .bind(tag_ids.to_vec())
    .execute(executor)
    .await?;

    Ok(())
}
