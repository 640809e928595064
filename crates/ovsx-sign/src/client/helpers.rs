//! Pure helpers: URL building and retry backoff (no HTTP, no status logic).

use std::time::Duration;

use rand::Rng;

use crate::error::RegistryError;
use crate::identity::ExtensionIdentity;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Registry API path for an extension version.
///
/// `{base}/api/{publisher}/{name}/{version}`, or `{base}/api/{publisher}/{name}`
/// when no version is known.
pub(crate) fn extension_api_url(base_url: &str, identity: &ExtensionIdentity) -> String {
    if identity.version.is_empty() {
        format!("{}/api/{}/{}", base_url, identity.publisher, identity.name)
    } else {
        format!(
            "{}/api/{}/{}/{}",
            base_url, identity.publisher, identity.name, identity.version
        )
    }
}

/// Well-known public key location at the registry root.
pub(crate) fn default_public_key_url(base_url: &str) -> String {
    format!("{}/file/public.pem", base_url)
}

/// Delay before retry number `retries` (1-based).
///
/// Rate limits honour `Retry-After` (capped at 30s, ±10% jitter); other
/// transient failures use exponential backoff with full jitter.
pub(crate) fn backoff_for(error: &RegistryError, retries: u32) -> Duration {
    match error {
        RegistryError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            let capped = (*retry_after).min(MAX_BACKOFF);
            let base_ms = capped.as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        _ => {
            let base_backoff = Duration::from_secs(1_u64 << retries.min(5)).min(MAX_BACKOFF);
            let jittered_ms = rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}
