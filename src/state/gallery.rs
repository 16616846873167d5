//! Gallery State
//!
//! Owns the ordered asset collection and turns gestures (drag-and-drop,
//! pin, rating) into optimistic mutations persisted through the
//! `GalleryStore`. The lock is only held for synchronous work; persistence
//! runs after it is released so further gestures stay responsive.

use std::sync::{Arc, Mutex, MutexGuard};

use dragdrop::{DropEvent, DropTarget};
use serde::Serialize;

use crate::domain::ordering::{self, SortMode};
use crate::domain::{Asset, DomainResult, FieldUpdate, PositionUpdate};
use crate::repository::GalleryStore;
use super::notice::Notifier;
use super::reconcile::{CommitTicket, ReconcilingList, Settled};

/// What a single gesture ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ReorderOutcome {
    Committed,
    RolledBack,
    Superseded,
    Ignored(IgnoreReason),
}

/// Why a gesture was a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NoDragInProgress,
    SelfDrop,
    UnknownItem,
    NotManualOrder,
    CrossesPinned,
    InvalidValue,
}

/// Persistence payload captured at commit time
#[derive(Debug, Clone, PartialEq)]
enum Mutation {
    Reorder(Vec<PositionUpdate>),
    Field { id: u32, update: FieldUpdate },
}

struct GalleryInner {
    list: ReconcilingList<Asset>,
    sort_mode: SortMode,
    dragged: Option<u32>,
}

impl GalleryInner {
    fn index_of(&self, id: u32) -> Option<usize> {
        self.list.items().iter().position(|a| a.id == id)
    }

    /// Source and destination index for moving `dragged`, validated
    /// against the live collection.
    fn plan_move(&self, dragged: u32, target: DropTarget) -> Result<(usize, usize), IgnoreReason> {
        if target == DropTarget::Item(dragged) {
            return Err(IgnoreReason::SelfDrop);
        }
        let from = self.index_of(dragged).ok_or(IgnoreReason::UnknownItem)?;
        let to = match target {
            DropTarget::Item(id) => self.index_of(id).ok_or(IgnoreReason::UnknownItem)?,
            DropTarget::Zone(zone) => {
                ordering::zone_to_index(from, zone, self.list.items().len())
            }
        };
        if from == to {
            return Err(IgnoreReason::SelfDrop);
        }
        if self.sort_mode != SortMode::Manual {
            return Err(IgnoreReason::NotManualOrder);
        }

        let items = self.list.items();
        // The item currently at `to` is the one displaced by the move
        if items[from].pinned != items[to].pinned {
            return Err(IgnoreReason::CrossesPinned);
        }
        Ok((from, to))
    }

    fn resort(&mut self) {
        let mode = self.sort_mode;
        self.list.adjust_view(|items| ordering::sort_assets(items, mode));
    }
}

#[derive(Clone)]
pub struct GalleryState {
    inner: Arc<Mutex<GalleryInner>>,
    store: Arc<dyn GalleryStore>,
    notifier: Notifier,
}

impl GalleryState {
    pub fn new(store: Arc<dyn GalleryStore>, notifier: Notifier) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GalleryInner {
                list: ReconcilingList::default(),
                sort_mode: SortMode::default(),
                dragged: None,
            })),
            store,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, GalleryInner> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current render order
    pub fn items(&self) -> Vec<Asset> {
        self.lock().list.items().to_vec()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.lock().list.items().iter().map(|a| a.id).collect()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().list.is_pending()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.lock().sort_mode
    }

    /// Fetch from the store and adopt the result (unless a change is pending)
    pub async fn load(&self) -> DomainResult<bool> {
        let assets = self.store.list_assets().await?;
        Ok(self.replace(assets))
    }

    /// Adopt an authoritative collection. Ignored while a change is pending.
    pub fn replace(&self, mut assets: Vec<Asset>) -> bool {
        let mut inner = self.lock();
        ordering::sort_assets(&mut assets, inner.sort_mode);
        inner.list.replace(assets)
    }

    /// Local re-sort; nothing is persisted
    pub fn set_sort_mode(&self, mode: SortMode) {
        let mut inner = self.lock();
        if inner.sort_mode == mode {
            return;
        }
        inner.sort_mode = mode;
        inner.resort();
        log::debug!("Gallery sort mode set to {}", mode.as_str());
    }

    /// Reflect a field value the store already accepted (e.g. an autosaved title)
    pub fn apply_server_value(&self, id: u32, update: &FieldUpdate) {
        let mut inner = self.lock();
        let mode = inner.sort_mode;
        inner.list.apply_persisted(|items| {
            if let Some(asset) = items.iter_mut().find(|a| a.id == id) {
                asset.apply(update);
                ordering::sort_assets(items, mode);
            }
        });
    }

    // ========================================================================
    // Drag and drop
    // ========================================================================

    pub fn drag_start(&self, id: u32) {
        self.lock().dragged = Some(id);
    }

    pub fn dragged(&self) -> Option<u32> {
        self.lock().dragged
    }

    pub fn drag_cancel(&self) {
        self.lock().dragged = None;
    }

    /// Drop the item recorded by `drag_start` onto another item
    pub async fn drop_on(&self, target: u32) -> ReorderOutcome {
        self.drop_at(DropTarget::Item(target)).await
    }

    /// Drop the item recorded by `drag_start` into the gap before `zone`
    pub async fn drop_on_zone(&self, zone: usize) -> ReorderOutcome {
        self.drop_at(DropTarget::Zone(zone)).await
    }

    /// Complete a gesture reported by a pointer-driven `DragSession`
    pub async fn apply_drop(&self, event: DropEvent) -> ReorderOutcome {
        self.drag_cancel();
        self.move_asset(event.dragged, event.target).await
    }

    async fn drop_at(&self, target: DropTarget) -> ReorderOutcome {
        let dragged = self.lock().dragged.take();
        match dragged {
            Some(dragged) => self.move_asset(dragged, target).await,
            None => ReorderOutcome::Ignored(IgnoreReason::NoDragInProgress),
        }
    }

    /// Move `dragged` to the pre-move position of `target`
    pub async fn reorder(&self, dragged: u32, target: u32) -> ReorderOutcome {
        self.move_asset(dragged, DropTarget::Item(target)).await
    }

    /// Fire-and-forget `reorder` on the runtime
    pub fn spawn_reorder(&self, dragged: u32, target: u32) -> tokio::task::JoinHandle<ReorderOutcome> {
        let gallery = self.clone();
        tokio::spawn(async move { gallery.reorder(dragged, target).await })
    }

    async fn move_asset(&self, dragged: u32, target: DropTarget) -> ReorderOutcome {
        let ticket = {
            let mut inner = self.lock();
            let (from, to) = match inner.plan_move(dragged, target) {
                Ok(plan) => plan,
                Err(reason) => {
                    log::debug!("Ignoring drop of asset {}: {:?}", dragged, reason);
                    return ReorderOutcome::Ignored(reason);
                }
            };
            inner.list.apply_local_mutation(|items| {
                ordering::move_item(items, from, to);
                ordering::renumber(items);
            });
            inner
                .list
                .commit(|items| Mutation::Reorder(ordering::dense_positions(items)))
        };

        match ticket {
            Some(ticket) => self.persist(ticket).await,
            None => ReorderOutcome::Ignored(IgnoreReason::SelfDrop),
        }
    }

    // ========================================================================
    // Field mutations
    // ========================================================================

    pub async fn toggle_pin(&self, id: u32) -> ReorderOutcome {
        let pinned = {
            let inner = self.lock();
            match inner.list.items().iter().find(|a| a.id == id) {
                Some(asset) => !asset.pinned,
                None => return ReorderOutcome::Ignored(IgnoreReason::UnknownItem),
            }
        };
        self.update_field(id, FieldUpdate::Pinned(pinned)).await
    }

    pub async fn set_rating(&self, id: u32, rating: Option<u8>) -> ReorderOutcome {
        self.update_field(id, FieldUpdate::Rating(rating)).await
    }

    async fn update_field(&self, id: u32, update: FieldUpdate) -> ReorderOutcome {
        if update.validate().is_err() {
            return ReorderOutcome::Ignored(IgnoreReason::InvalidValue);
        }

        let ticket = {
            let mut inner = self.lock();
            let Some(index) = inner.index_of(id) else {
                return ReorderOutcome::Ignored(IgnoreReason::UnknownItem);
            };
            let mode = inner.sort_mode;
            inner.list.apply_local_mutation(|items| {
                items[index].apply(&update);
                ordering::sort_assets(items, mode);
            });
            inner.list.commit(|_| Mutation::Field { id, update })
        };

        match ticket {
            Some(ticket) => self.persist(ticket).await,
            None => ReorderOutcome::Ignored(IgnoreReason::UnknownItem),
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    async fn persist(&self, ticket: CommitTicket<Asset, Mutation>) -> ReorderOutcome {
        let result = match ticket.payload() {
            Mutation::Reorder(updates) => self.store.persist_reorder(updates).await,
            Mutation::Field { id, update } => self.store.persist_field_value(*id, update).await,
        };

        let (settled, resync) = {
            let mut inner = self.lock();
            let settled = inner.list.settle(ticket, &result);
            if settled == Settled::RolledBack {
                // Snapshot may predate a sort mode change
                inner.resort();
            }
            (settled, inner.list.take_needs_resync())
        };

        let outcome = match settled {
            Settled::Committed => ReorderOutcome::Committed,
            Settled::RolledBack => {
                let reason = result.err().map(|e| e.to_string()).unwrap_or_default();
                self.notifier.error(format!("Could not save changes: {}", reason));
                ReorderOutcome::RolledBack
            }
            Settled::Superseded => {
                log::debug!("Discarding stale persistence result");
                ReorderOutcome::Superseded
            }
        };

        if resync {
            match self.load().await {
                Ok(adopted) => log::debug!("Gallery resynced from store (adopted: {})", adopted),
                Err(e) => log::warn!("Gallery resync failed: {}", e),
            }
        }
        outcome
    }
}
