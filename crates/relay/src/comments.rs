use std::fs;
use std::path::Path;

use crowd_core::Comment;
use tracing::info;

use crate::error::RelayError;

/// Read a comment batch: a JSON array of `{"text", "published_at"}`.
/// Comments come back oldest first, which is the order votes are counted in.
pub fn load_batch(path: &Path) -> Result<Vec<Comment>, RelayError> {
    let json = fs::read_to_string(path)?;
    let comments = parse_batch(&json)?;
    info!(path = %path.display(), count = comments.len(), "Loaded comment batch");
    Ok(comments)
}

pub fn parse_batch(json: &str) -> Result<Vec<Comment>, RelayError> {
    let mut comments: Vec<Comment> = serde_json::from_str(json)?;
    comments.sort_by_key(|c| c.published_at);
    Ok(comments)
}
