use async_trait::async_trait;

use crate::domain::errors::CacheError;
use crate::domain::models::Identifier;

/// Values of the requested fields for one key, in request order.
///
/// A `None` marks a field (or the whole entry) that the store does not hold.
pub type FieldSet = Vec<Option<Vec<u8>>>;

/// Port for the key-value store holding cached record data.
///
/// Implementations must be safe to share between workers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Count how many of `keys` exist, in a single request.
    async fn count_existing(&self, keys: &[Identifier]) -> Result<usize, CacheError>;

    /// Fetch `fields` for every key in one round trip.
    ///
    /// Returns one `FieldSet` per key in key order. A transport failure
    /// fails the whole call.
    async fn fetch_fields(
        &self,
        keys: &[Identifier],
        fields: &[&str],
    ) -> Result<Vec<FieldSet>, CacheError>;
}
