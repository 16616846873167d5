//! State Layer
//!
//! In-memory state that reacts to user gestures before the backend does:
//! the optimistic gallery order, debounced field autosave and the notices
//! both emit.

pub mod reconcile;
pub mod gallery;
pub mod autosave;
pub mod notice;

pub use reconcile::{CommitTicket, ReconcilingList, Settled};
pub use gallery::{GalleryState, IgnoreReason, ReorderOutcome};
pub use autosave::{AutosaveController, AutosaveOutcome, AutosavePhase, FieldKey, DEFAULT_DEBOUNCE};
pub use notice::{notice_channel, Notice, NoticeLevel, NoticeReceiver, Notifier};
