use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use super::ownership::{can_reclaim, require_owner};
use super::recipe_file::{AttachOutcome, RecipeFileStore};
use super::{Page, PageRequest, ServiceError};
use crate::entity::{history_entry, user};

/// Fields of a history entry supplied by the caller.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub title: String,
    pub content: String,
    pub recipe_file_id: Option<i32>,
}

/// What happened to the recipe file behind a deleted history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclamation {
    /// The entry had no recipe file.
    NotApplicable,
    /// The file had no remaining references and was deleted.
    Reclaimed,
    /// The file is still referenced or belongs to someone else.
    Retained,
    /// Cleanup failed; the entry deletion still committed.
    Failed,
}

/// Per-user recipe history and reclamation of unreferenced recipe files.
#[derive(Clone)]
pub struct HistoryService {
    db: DatabaseConnection,
    default_page_size: u64,
    reclamation_failures: Arc<AtomicU64>,
}

fn newest_first(query: Select<history_entry::Entity>) -> Select<history_entry::Entity> {
    query
        .order_by_desc(history_entry::Column::CreatedAt)
        .order_by_desc(history_entry::Column::Id)
}

impl HistoryService {
    pub fn new(db: DatabaseConnection, default_page_size: u64) -> Self {
        Self {
            db,
            default_page_size,
            reclamation_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn default_page_size(&self) -> u64 {
        self.default_page_size
    }

    /// Number of reclamation attempts that failed since startup.
    pub fn reclamation_failures(&self) -> u64 {
        self.reclamation_failures.load(Ordering::Relaxed)
    }

    /// Record a history entry, claiming its recipe file if nobody owns it yet.
    #[instrument(skip(self, entry), fields(recipe_file_id = ?entry.recipe_file_id))]
    pub async fn save(
        &self,
        user_id: i32,
        entry: NewHistoryEntry,
    ) -> Result<history_entry::Model, ServiceError> {
        let txn = self.db.begin().await?;

        user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {user_id} not found")))?;

        if let Some(file_id) = entry.recipe_file_id {
            let store = RecipeFileStore::new(&txn);
            store.find(file_id).await?.ok_or_else(|| {
                ServiceError::NotFound(format!("Recipe file {file_id} not found"))
            })?;

            match store.attach_owner(file_id, user_id).await? {
                AttachOutcome::Claimed => debug!(file_id, "Recipe file claimed"),
                AttachOutcome::AlreadyOwned => debug!(file_id, "Recipe file already owned"),
            }
        }

        let model = history_entry::ActiveModel {
            user_id: Set(user_id),
            title: Set(entry.title),
            content: Set(entry.content),
            recipe_file_id: Set(entry.recipe_file_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(entry_id = model.id, "History entry saved");
        Ok(model)
    }

    /// All of a user's entries, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<history_entry::Model>, ServiceError> {
        let entries = newest_first(
            history_entry::Entity::find().filter(history_entry::Column::UserId.eq(user_id)),
        )
        .all(&self.db)
        .await?;
        Ok(entries)
    }

    pub async fn get_page(
        &self,
        user_id: i32,
        request: PageRequest,
    ) -> Result<Page<history_entry::Model>, ServiceError> {
        let query = history_entry::Entity::find().filter(history_entry::Column::UserId.eq(user_id));
        let total = query.clone().count(&self.db).await?;
        if request.is_past(total) {
            return Ok(Page::new(Vec::new(), total, request));
        }

        let items = newest_first(query)
            .offset(request.offset())
            .limit(request.limit())
            .all(&self.db)
            .await?;

        Ok(Page::new(items, total, request))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<history_entry::Model>, ServiceError> {
        Ok(history_entry::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// An entry that must belong to `user_id`.
    pub async fn find_for_user(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<history_entry::Model, ServiceError> {
        let entry = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("History entry {id} not found")))?;
        require_owner(entry.user_id, user_id, ServiceError::WrongOwner)?;
        Ok(entry)
    }

    /// Delete an entry owned by `user_id`, then reclaim its recipe file if it
    /// became unreferenced.
    #[instrument(skip(self))]
    pub async fn delete_from_history(
        &self,
        user_id: i32,
        entry_id: i32,
    ) -> Result<Reclamation, ServiceError> {
        let txn = self.db.begin().await?;

        let entry = history_entry::Entity::find_by_id(entry_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("History entry {entry_id} not found")))?;
        require_owner(entry.user_id, user_id, ServiceError::WrongOwner)?;

        history_entry::Entity::delete_by_id(entry.id).exec(&txn).await?;

        let reclamation = match entry.recipe_file_id {
            None => Reclamation::NotApplicable,
            Some(file_id) => match reclaim(&txn, file_id, user_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.reclamation_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(file_id, error = %e, "Recipe file reclamation failed");
                    Reclamation::Failed
                }
            },
        };

        txn.commit().await?;
        info!(?reclamation, "History entry deleted");
        Ok(reclamation)
    }
}

/// Runs in a savepoint so a failure here never undoes the entry deletion.
async fn reclaim(
    txn: &DatabaseTransaction,
    file_id: i32,
    deleter: i32,
) -> Result<Reclamation, DbErr> {
    let savepoint = txn.begin().await?;
    let store = RecipeFileStore::new(&savepoint);

    let Some(file) = store.find_for_update(file_id).await? else {
        savepoint.commit().await?;
        return Ok(Reclamation::NotApplicable);
    };

    let remaining = store.reference_count(file_id).await?;
    let outcome = if remaining == 0 && can_reclaim(file.owner_id, deleter) {
        store.delete(file_id).await?;
        Reclamation::Reclaimed
    } else {
        debug!(file_id, remaining, owner = ?file.owner_id, "Recipe file retained");
        Reclamation::Retained
    };

    savepoint.commit().await?;
    Ok(outcome)
}
