//! Debounced Autosave
//!
//! Text fields in the detail panel are written back after a quiet period
//! instead of on every keystroke. One timer per field; a newer edit always
//! wins over the late result of an older commit.
//!
//! Phase is derived from the draft:
//! - `PendingCommit`: a debounce timer is armed
//! - `Committing`: a persistence call is outstanding, no timer armed
//! - `Idle`: neither

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::domain::TextField;
use crate::repository::GalleryStore;
use super::gallery::GalleryState;
use super::notice::Notifier;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);

/// One editable text field of one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldKey {
    pub asset_id: u32,
    pub field: TextField,
}

impl FieldKey {
    pub fn new(asset_id: u32, field: TextField) -> Self {
        Self { asset_id, field }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutosavePhase {
    Idle,
    PendingCommit,
    Committing,
}

/// Result of one commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutosaveOutcome {
    Committed,
    Reverted,
    /// A newer edit arrived while this commit was outstanding
    Stale,
    NothingPending,
}

#[derive(Debug)]
struct FieldDraft {
    /// Last value known to be persisted
    baseline: String,
    /// Generation of the commit that produced `baseline`
    baseline_generation: u64,
    displayed: String,
    /// Bumped by every edit, commit and cancel
    generation: u64,
    timer: Option<JoinHandle<()>>,
    /// Generation and value of the newest outstanding commit
    in_flight: Option<(u64, String)>,
}

impl FieldDraft {
    fn phase(&self) -> AutosavePhase {
        if self.timer.is_some() {
            AutosavePhase::PendingCommit
        } else if self.in_flight.is_some() {
            AutosavePhase::Committing
        } else {
            AutosavePhase::Idle
        }
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[derive(Default)]
struct AutosaveInner {
    drafts: HashMap<FieldKey, FieldDraft>,
    next_generation: u64,
}

impl AutosaveInner {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}

#[derive(Clone)]
pub struct AutosaveController {
    inner: Arc<Mutex<AutosaveInner>>,
    store: Arc<dyn GalleryStore>,
    notifier: Notifier,
    debounce: Duration,
    /// Receives persisted values so list views show them without a reload
    gallery: Option<GalleryState>,
}

impl AutosaveController {
    pub fn new(store: Arc<dyn GalleryStore>, notifier: Notifier) -> Self {
        Self::with_debounce(store, notifier, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(store: Arc<dyn GalleryStore>, notifier: Notifier, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AutosaveInner::default())),
            store,
            notifier,
            debounce,
            gallery: None,
        }
    }

    pub fn mirror_to(mut self, gallery: GalleryState) -> Self {
        self.gallery = Some(gallery);
        self
    }

    fn lock(&self) -> MutexGuard<'_, AutosaveInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn displayed(&self, key: FieldKey) -> Option<String> {
        self.lock().drafts.get(&key).map(|d| d.displayed.clone())
    }

    pub fn baseline(&self, key: FieldKey) -> Option<String> {
        self.lock().drafts.get(&key).map(|d| d.baseline.clone())
    }

    pub fn phase(&self, key: FieldKey) -> AutosavePhase {
        self.lock()
            .drafts
            .get(&key)
            .map(FieldDraft::phase)
            .unwrap_or(AutosavePhase::Idle)
    }

    pub fn has_timer(&self, key: FieldKey) -> bool {
        self.lock()
            .drafts
            .get(&key)
            .is_some_and(|d| d.timer.is_some())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Seed or refresh the baseline from the server value.
    /// Ignored while an edit or commit is outstanding.
    pub fn track(&self, key: FieldKey, server_value: &str) {
        let mut inner = self.lock();
        match inner.drafts.get_mut(&key) {
            Some(draft) if draft.phase() != AutosavePhase::Idle => {
                log::debug!("Not refreshing {:?}: edit outstanding", key);
            }
            Some(draft) => {
                draft.baseline = server_value.to_string();
                draft.displayed = server_value.to_string();
            }
            None => {
                inner.drafts.insert(
                    key,
                    FieldDraft {
                        baseline: server_value.to_string(),
                        baseline_generation: 0,
                        displayed: server_value.to_string(),
                        generation: 0,
                        timer: None,
                        in_flight: None,
                    },
                );
            }
        }
    }

    /// Stop tracking a field (e.g. the detail panel closed). Outstanding
    /// commits still resolve but no longer touch any state.
    pub fn untrack(&self, key: FieldKey) {
        if let Some(mut draft) = self.lock().drafts.remove(&key) {
            draft.disarm();
        }
    }

    /// User typed. (Re)arms the debounce timer when the value differs from
    /// what the server will hold once outstanding commits land.
    /// Must be called from within a tokio runtime.
    pub fn on_change(&self, key: FieldKey, value: &str) {
        let mut inner = self.lock();
        let generation = inner.bump();
        let Some(draft) = inner.drafts.get_mut(&key) else {
            log::warn!("Edit for untracked field {:?} ignored", key);
            return;
        };

        draft.disarm();
        draft.generation = generation;
        draft.displayed = value.to_string();

        match &draft.in_flight {
            // Typed back to the value being saved: its result is current again
            Some((committing, pending)) if pending.as_str() == value => {
                draft.generation = *committing;
            }
            Some(_) => draft.timer = Some(self.schedule(key, generation)),
            None if value != draft.baseline => {
                draft.timer = Some(self.schedule(key, generation));
            }
            None => {}
        }
    }

    /// Explicit confirm: skip the remaining wait and commit now
    pub async fn commit_now(&self, key: FieldKey) -> AutosaveOutcome {
        match self.begin_commit(key, None) {
            Some((generation, value)) => self.finish_commit(key, generation, value).await,
            None => AutosaveOutcome::NothingPending,
        }
    }

    /// Explicit cancel: drop the pending edit and show the baseline again.
    /// No effect once a commit is already outstanding.
    pub fn cancel(&self, key: FieldKey) -> bool {
        let mut inner = self.lock();
        let generation = inner.bump();
        let Some(draft) = inner.drafts.get_mut(&key) else {
            return false;
        };
        if draft.timer.is_none() {
            return false;
        }
        draft.disarm();
        draft.generation = generation;
        draft.displayed = draft.baseline.clone();
        true
    }

    // ========================================================================
    // Commit
    // ========================================================================

    fn schedule(&self, key: FieldKey, generation: u64) -> JoinHandle<()> {
        let controller = self.clone();
        let delay = self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some((generation, value)) = controller.begin_commit(key, Some(generation)) {
                controller.finish_commit(key, generation, value).await;
            }
        })
    }

    /// PendingCommit -> Committing. `armed` is the generation of the timer
    /// that fired, `None` for an explicit commit.
    fn begin_commit(&self, key: FieldKey, armed: Option<u64>) -> Option<(u64, String)> {
        let mut inner = self.lock();
        let generation = inner.bump();
        let draft = inner.drafts.get_mut(&key)?;
        if draft.timer.is_none() {
            return None;
        }
        if let Some(armed) = armed {
            if armed != draft.generation {
                return None;
            }
            // Fired from inside the timer task; detach instead of aborting
            draft.timer = None;
        } else {
            draft.disarm();
        }

        draft.generation = generation;
        draft.in_flight = Some((generation, draft.displayed.clone()));
        Some((generation, draft.displayed.clone()))
    }

    async fn finish_commit(&self, key: FieldKey, generation: u64, value: String) -> AutosaveOutcome {
        let update = key.field.update(value.clone());
        let result = self.store.persist_field_value(key.asset_id, &update).await;

        let mut persisted = false;
        let outcome = {
            let mut inner = self.lock();
            let Some(draft) = inner.drafts.get_mut(&key) else {
                return AutosaveOutcome::Stale;
            };
            if draft.in_flight.as_ref().is_some_and(|(g, _)| *g == generation) {
                draft.in_flight = None;
            }
            // Commits can land out of order; only a newer one moves the baseline
            if result.is_ok() && generation > draft.baseline_generation {
                let previous = std::mem::replace(&mut draft.baseline, value);
                draft.baseline_generation = generation;
                // An idle field still showing the old baseline (edit cancelled
                // while this commit was out) follows the persisted value
                if draft.phase() == AutosavePhase::Idle && draft.displayed == previous {
                    draft.displayed = draft.baseline.clone();
                }
                persisted = true;
            }

            if draft.generation != generation {
                AutosaveOutcome::Stale
            } else if result.is_ok() {
                AutosaveOutcome::Committed
            } else {
                draft.displayed = draft.baseline.clone();
                AutosaveOutcome::Reverted
            }
        };

        match (&outcome, &result) {
            (AutosaveOutcome::Committed, _) => {
                self.notifier.success(format!("Saved {}", key.field.as_str()));
            }
            (AutosaveOutcome::Reverted, Err(e)) => {
                self.notifier
                    .error(format!("Could not save {}: {}", key.field.as_str(), e));
            }
            _ => log::debug!("Discarding stale commit result for {:?}", key),
        }
        if persisted {
            if let Some(gallery) = &self.gallery {
                gallery.apply_server_value(key.asset_id, &update);
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, DomainError, DomainResult, FieldUpdate, NewAsset, PositionUpdate};
    use crate::state::notice::{drain, notice_channel, NoticeLevel, NoticeReceiver};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct FakeStore {
        calls: Mutex<Vec<(u32, FieldUpdate)>>,
        fail: AtomicBool,
        gate: tokio::sync::Mutex<()>,
    }

    impl FakeStore {
        fn calls(&self) -> Vec<(u32, FieldUpdate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GalleryStore for FakeStore {
        async fn list_assets(&self) -> DomainResult<Vec<Asset>> {
            Ok(Vec::new())
        }

        async fn persist_reorder(&self, _updates: &[PositionUpdate]) -> DomainResult<()> {
            Ok(())
        }

        async fn persist_field_value(&self, id: u32, update: &FieldUpdate) -> DomainResult<()> {
            self.calls.lock().unwrap().push((id, update.clone()));
            let _gate = self.gate.lock().await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(DomainError::Storage("timeout".to_string()));
            }
            Ok(())
        }

        async fn create_asset(&self, _asset: &NewAsset) -> DomainResult<Asset> {
            Err(DomainError::Internal("not used".to_string()))
        }

        async fn delete_asset(&self, _id: u32) -> DomainResult<()> {
            Ok(())
        }
    }

    const KEY: FieldKey = FieldKey {
        asset_id: 7,
        field: TextField::Title,
    };

    fn setup() -> (AutosaveController, Arc<FakeStore>, NoticeReceiver) {
        let store = Arc::new(FakeStore::default());
        let (notifier, rx) = notice_channel();
        let controller = AutosaveController::new(store.clone(), notifier);
        controller.track(KEY, "Logo");
        (controller, store, rx)
    }

    async fn quiet() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_commits_once_with_last_value() {
        let (controller, store, mut rx) = setup();

        controller.on_change(KEY, "Logo v");
        tokio::time::sleep(Duration::from_millis(300)).await;
        controller.on_change(KEY, "Logo v2");
        tokio::time::sleep(Duration::from_millis(300)).await;
        controller.on_change(KEY, "Logo v2 final");
        assert_eq!(controller.phase(KEY), AutosavePhase::PendingCommit);
        assert!(store.calls().is_empty());

        quiet().await;

        assert_eq!(
            store.calls(),
            vec![(7, FieldUpdate::Title("Logo v2 final".to_string()))]
        );
        assert_eq!(controller.baseline(KEY).as_deref(), Some("Logo v2 final"));
        assert_eq!(controller.phase(KEY), AutosavePhase::Idle);
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_value_arms_no_timer() {
        let (controller, store, _) = setup();
        controller.on_change(KEY, "Logo x");
        controller.on_change(KEY, "Logo");
        assert!(!controller.has_timer(KEY));
        quiet().await;
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_now_skips_the_wait() {
        let (controller, store, _) = setup();
        controller.on_change(KEY, "Hero");

        assert_eq!(controller.commit_now(KEY).await, AutosaveOutcome::Committed);
        assert!(!controller.has_timer(KEY));
        assert_eq!(store.calls().len(), 1);

        // no second commit from the cancelled timer
        quiet().await;
        assert_eq!(store.calls().len(), 1);
        assert_eq!(controller.commit_now(KEY).await, AutosaveOutcome::NothingPending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reverts_without_network() {
        let (controller, store, mut rx) = setup();
        controller.on_change(KEY, "Oops");

        assert!(controller.cancel(KEY));
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Logo"));
        assert_eq!(controller.phase(KEY), AutosavePhase::Idle);

        quiet().await;
        assert!(store.calls().is_empty());
        assert!(drain(&mut rx).is_empty());
        assert!(!controller.cancel(KEY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reverts_to_baseline() {
        let (controller, store, mut rx) = setup();
        store.fail.store(true, Ordering::SeqCst);

        controller.on_change(KEY, "Broken");
        quiet().await;

        assert_eq!(store.calls().len(), 1);
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Logo"));
        assert_eq!(controller.baseline(KEY).as_deref(), Some("Logo"));
        assert_eq!(controller.phase(KEY), AutosavePhase::Idle);
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);

        // no automatic retry
        quiet().await;
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_commit_does_not_clobber_newer_edit() {
        let (controller, store, _) = setup();
        controller.on_change(KEY, "First");

        let gate = store.gate.lock().await;
        let c = controller.clone();
        let first = tokio::spawn(async move { c.commit_now(KEY).await });
        while store.calls().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(controller.phase(KEY), AutosavePhase::Committing);

        controller.on_change(KEY, "Second");
        assert!(controller.has_timer(KEY));

        drop(gate);
        assert_eq!(first.await.unwrap(), AutosaveOutcome::Stale);
        // the older success still moved the baseline, but not the new edit
        assert_eq!(controller.baseline(KEY).as_deref(), Some("First"));
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Second"));
        assert!(controller.has_timer(KEY));

        quiet().await;
        assert_eq!(controller.baseline(KEY).as_deref(), Some("Second"));
        assert_eq!(store.calls().len(), 2);
    }

    /// Starts an explicit commit of `value` and waits until it is outstanding
    async fn commit_held(
        controller: &AutosaveController,
        store: &FakeStore,
        value: &str,
    ) -> JoinHandle<AutosaveOutcome> {
        controller.on_change(KEY, value);
        let calls = store.calls().len();
        let c = controller.clone();
        let handle = tokio::spawn(async move { c.commit_now(KEY).await });
        while store.calls().len() == calls {
            tokio::task::yield_now().await;
        }
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reverts_after_typing_back_to_committing_value() {
        let (controller, store, mut rx) = setup();
        store.fail.store(true, Ordering::SeqCst);
        let gate = store.gate.lock().await;
        let first = commit_held(&controller, &store, "First").await;

        controller.on_change(KEY, "Firstx");
        controller.on_change(KEY, "First");
        assert!(!controller.has_timer(KEY));
        assert_eq!(controller.phase(KEY), AutosavePhase::Committing);

        drop(gate);
        assert_eq!(first.await.unwrap(), AutosaveOutcome::Reverted);
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Logo"));
        assert_eq!(controller.phase(KEY), AutosavePhase::Idle);
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);

        quiet().await;
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_commit_shows_committed_value() {
        let (controller, store, mut rx) = setup();
        let gate = store.gate.lock().await;
        let first = commit_held(&controller, &store, "First").await;

        controller.on_change(KEY, "Second");
        assert!(controller.cancel(KEY));
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Logo"));

        drop(gate);
        assert_eq!(first.await.unwrap(), AutosaveOutcome::Stale);
        assert_eq!(controller.baseline(KEY).as_deref(), Some("First"));
        assert_eq!(controller.displayed(KEY).as_deref(), Some("First"));
        assert_eq!(controller.phase(KEY), AutosavePhase::Idle);
        assert!(drain(&mut rx).is_empty());

        quiet().await;
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_committed_value_reaches_gallery() {
        let store = Arc::new(FakeStore::default());
        let (notifier, _rx) = notice_channel();
        let gallery = GalleryState::new(store.clone(), notifier.clone());
        let mut asset = Asset::new(7, "Logo".to_string(), "https://cdn/7.png".to_string(), "image/png".to_string());
        asset.description = Some("old".to_string());
        gallery.replace(vec![asset]);
        let controller = AutosaveController::new(store.clone(), notifier).mirror_to(gallery.clone());
        controller.track(KEY, "Logo");

        controller.on_change(KEY, "Logo final");
        quiet().await;
        assert_eq!(gallery.items()[0].title, "Logo final");

        store.fail.store(true, Ordering::SeqCst);
        controller.on_change(KEY, "Broken");
        quiet().await;
        assert_eq!(gallery.items()[0].title, "Logo final");
        assert!(!gallery.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_ignored_while_editing() {
        let (controller, _, _) = setup();
        controller.on_change(KEY, "Draft");
        controller.track(KEY, "Server");
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Draft"));
        assert_eq!(controller.baseline(KEY).as_deref(), Some("Logo"));

        controller.cancel(KEY);
        controller.track(KEY, "Server");
        assert_eq!(controller.displayed(KEY).as_deref(), Some("Server"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_field_is_ignored() {
        let (controller, store, _) = setup();
        let other = FieldKey::new(8, TextField::Description);
        controller.on_change(other, "text");
        assert_eq!(controller.displayed(other), None);
        controller.untrack(KEY);
        quiet().await;
        assert!(store.calls().is_empty());
    }
}
