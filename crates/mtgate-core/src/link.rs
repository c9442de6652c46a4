//! Connection link derivation.
//!
//! Pure: reads the current config plus a secret, produces a t.me proxy
//! URI. With a TLS domain configured the secret is wrapped in the
//! fake-TLS form (`ee` marker plus hex-encoded domain); otherwise the
//! secure-mode `dd` marker is used.

use crate::Secret;
use crate::service::ProxyConfig;

/// Used when the public-ip lookup is unavailable.
pub const FALLBACK_PUBLIC_IP: &str = "130.185.123.84";

#[must_use]
pub fn build_link(secret: &Secret, config: &ProxyConfig, public_ip: &str) -> String {
    let full_secret = match config.tls_domain.as_deref() {
        Some(domain) if !domain.is_empty() => {
            format!("ee{secret}{}", hex::encode(domain.as_bytes()))
        }
        _ => format!("dd{secret}"),
    };

    format!(
        "https://t.me/proxy?server={public_ip}&port={}&secret={full_secret}",
        config.port
    )
}
