//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO storage dependencies (serde for serialization only).

mod entity;
mod asset;
mod tag;
mod comment;
pub mod ordering;
pub mod survey;

pub use entity::{Entity, DomainError, DomainResult};
pub use asset::{Asset, NewAsset, FieldUpdate, TextField, MAX_RATING, MAX_TITLE_LEN};
pub use tag::{Tag, AssetTag};
pub use comment::Comment;
pub use ordering::{PositionUpdate, SortMode};
pub use survey::{SurveyDefinition, SurveyResponse, SurveySummary};
