use crate::store::{ProjectStore, StoreResult};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Short URL-safe random token.
pub fn generate_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draw ids until one is unused. `None` after `attempts` collisions.
pub async fn generate_unique_id<S>(store: &S, len: usize, attempts: u32) -> StoreResult<Option<String>>
where
    S: ProjectStore + ?Sized,
{
    for _ in 0..attempts {
        let id = generate_id(len);
        if store.project_by_id(&id).await?.is_none() {
            return Ok(Some(id));
        }
        tracing::debug!(id = %id, "project id collision, retrying");
    }
    Ok(None)
}
