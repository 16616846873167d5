//! Commands Layer
//!
//! Operations the UI invokes. Errors cross this boundary as strings.

mod asset_cmd;
mod tag_cmd;
mod comment_cmd;
mod survey_cmd;

pub use asset_cmd::*;
pub use tag_cmd::*;
pub use comment_cmd::*;
pub use survey_cmd::*;
