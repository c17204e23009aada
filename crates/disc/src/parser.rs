use crate::error::Result;
use crate::models::PlaylistInfo;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Produces track metadata for a structural file (a playlist or a container).
///
/// Implementations fail with [`ErrorKind::ParseFailed`](crate::error::ErrorKind::ParseFailed)
/// when the file cannot be understood.
#[async_trait]
pub trait PlaylistParser: Send + Sync {
    async fn parse(&self, path: &Path) -> Result<PlaylistInfo>;
}

pub type ParserHandle = Arc<dyn PlaylistParser>;
