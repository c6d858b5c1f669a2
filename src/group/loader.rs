//! Loader Module
//!
//! The backing-source capability a group falls back to on a miss.

use async_trait::async_trait;

use crate::error::Result;

// == Loader ==
/// Loads the value for a key from the source of truth.
///
/// Return `CacheError::NotFound` when the key does not exist so callers
/// can tell a missing key from a failing source.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>>;
}

// == Loader Fn ==
/// Adapts a plain closure into a `Loader`.
///
/// The closure runs on the calling task, so it should not block for long.
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F> Loader for LoaderFn<F>
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    use tokio_test::{assert_err, assert_ok, block_on};

    #[test]
    fn test_loader_fn_calls_closure() {
        let loader = LoaderFn(|key: &str| -> Result<Vec<u8>> { Ok(key.as_bytes().to_vec()) });
        let bytes = assert_ok!(block_on(loader.load("key")));
        assert_eq!(bytes, b"key");
    }

    #[test]
    fn test_loader_fn_passes_errors_through() {
        let loader = LoaderFn(|key: &str| -> Result<Vec<u8>> {
            Err(CacheError::NotFound(key.to_string()))
        });
        let err = assert_err!(block_on(loader.load("missing")));
        assert_eq!(err, CacheError::NotFound("missing".into()));
    }

    #[tokio::test]
    async fn test_loader_behind_trait_object() {
        let loader: std::sync::Arc<dyn Loader> =
            std::sync::Arc::new(LoaderFn(|key: &str| -> Result<Vec<u8>> {
                Ok(key.len().to_string().into_bytes())
            }));
        assert_eq!(loader.load("four").await.unwrap(), b"4");
    }
}
