use crate::refs::reference_key;
use bookswap_storage::Storage;
use std::sync::Arc;
use std::time::Duration;

/// Resolves stored references into URLs clients can fetch.
///
/// Signing only ever applies to references the backend owns: bare keys and
/// URLs whose host is exactly the backend host. Inline `data:`/`blob:`
/// references, foreign hosts, and signing failures all pass the input
/// through unchanged, so the read path never hard-depends on the signer.
#[derive(Clone)]
pub struct UrlResolver {
    storage: Arc<dyn Storage>,
    signed_urls: bool,
    signed_url_ttl: Duration,
}

impl UrlResolver {
    pub fn new(storage: Arc<dyn Storage>, signed_urls: bool, signed_url_ttl_secs: u64) -> Self {
        Self {
            storage,
            signed_urls,
            signed_url_ttl: Duration::from_secs(signed_url_ttl_secs),
        }
    }

    /// Resolve one reference string.
    pub async fn resolve(&self, reference: &str) -> String {
        if !self.signed_urls {
            return reference.to_string();
        }

        let Some(key) = reference_key(self.storage.as_ref(), reference) else {
            return reference.to_string();
        };

        match self.storage.signed_url(&key, self.signed_url_ttl).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reference = %reference,
                    "URL signing failed, returning unsigned reference"
                );
                reference.to_string()
            }
        }
    }

    /// Resolve a reference list, preserving order.
    pub async fn resolve_all(&self, references: &[String]) -> Vec<String> {
        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            resolved.push(self.resolve(reference).await);
        }
        resolved
    }
}
