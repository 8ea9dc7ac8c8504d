//! Reading and writing the open-ticket snapshot.

use std::time::Duration;

use tracing::warn;

use crate::ticket::Ticket;

use super::{CacheError, CacheStore, SNAPSHOT_KEY};

/// Load the open-ticket snapshot.
///
/// A miss and an undecodable value both yield an empty list; only transport
/// failures are errors.
pub async fn load_snapshot(store: &dyn CacheStore) -> Result<Vec<Ticket>, CacheError> {
    let Some(bytes) = store.get(SNAPSHOT_KEY).await? else {
        return Ok(Vec::new());
    };

    match serde_json::from_slice::<Vec<Ticket>>(&bytes) {
        Ok(tickets) => Ok(tickets),
        Err(e) => {
            warn!(key = SNAPSHOT_KEY, error = %e, "Discarding undecodable ticket snapshot");
            Ok(Vec::new())
        }
    }
}

/// Replace the open-ticket snapshot and reset its TTL.
pub async fn save_snapshot(
    store: &dyn CacheStore,
    tickets: &[Ticket],
    ttl: Duration,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(tickets).map_err(|e| CacheError::Encode(e.to_string()))?;
    store.set(SNAPSHOT_KEY, bytes, ttl).await
}
