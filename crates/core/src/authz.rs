//! Authorization contract consumed by the realtime hub.

use async_trait::async_trait;

use crate::errors::Result;

/// Answers whether a user may observe an entity (a tracked account).
#[async_trait]
pub trait OwnershipCheck: Send + Sync {
    async fn is_owner(&self, user_id: &str, entity_key: &str) -> Result<bool>;
}
