//! Outbound publishing.
//!
//! Submodules:
//! - `bluesky`: posts reports to a Bluesky account.

use serde::Deserialize;

use crate::model::PublishError;

pub mod bluesky;

/// Reference to a created post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

/// A destination the rendered report can be posted to.
pub trait Publisher {
    /// Posts `text` as a single message.
    fn publish(&self, text: &str) -> Result<PostRef, PublishError>;
}
