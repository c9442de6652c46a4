//! Systemd unit parsing and rendering for the proxy daemon.
//!
//! The unit file's `ExecStart=` line is the single source of truth for
//! the daemon's live configuration. This module is the only code that
//! knows the text format; everything else works with [`ProxyConfig`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::{Error, Result, Secret};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_TLS_DOMAIN: &str = "www.cloudflare.com";
pub const DEFAULT_WORKERS: u32 = 1;

const PROXY_BINARY: &str = "/opt/MTProxy/objs/bin/mtproto-proxy";
const PROXY_WORKDIR: &str = "/opt/MTProxy/objs/bin";

/// The proxy daemon's live configuration as encoded in its unit file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Granted secrets, de-duplicated, insertion order preserved.
    pub secrets: Vec<Secret>,
    pub port: u16,
    pub tag: Option<Secret>,
    pub tls_domain: Option<String>,
    pub workers: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            port: DEFAULT_PORT,
            tag: None,
            tls_domain: Some(DEFAULT_TLS_DOMAIN.to_string()),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ProxyConfig {
    #[must_use]
    pub fn contains(&self, secret: &Secret) -> bool {
        self.secrets.contains(secret)
    }

    /// Insert a secret, keeping the set unique. Returns false if it was
    /// already present.
    pub fn insert(&mut self, secret: Secret) -> bool {
        if self.contains(&secret) {
            return false;
        }
        self.secrets.push(secret);
        true
    }

    /// Remove a secret. Returns false if it was not present.
    pub fn remove(&mut self, secret: &Secret) -> bool {
        let before = self.secrets.len();
        self.secrets.retain(|s| s != secret);
        self.secrets.len() != before
    }
}

fn exec_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^ExecStart=(.+)$").expect("valid regex"))
}

fn field_re(pattern: &'static str, slot: &'static OnceLock<Regex>) -> &'static Regex {
    slot.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Parse a unit file's contents into a [`ProxyConfig`].
///
/// A missing `ExecStart=` line fails the whole parse, as does any `-S`
/// token that is not a 32-char lowercase hex secret (a garbled secret
/// set must never be partially admitted). Optional fields fall back to
/// their documented defaults, and duplicate secrets are collapsed.
///
/// # Errors
///
/// Returns [`Error::ConfigUnreadable`] when the launch-command line is
/// absent and [`Error::InvalidSecret`] for malformed secret tokens.
pub fn parse_unit(content: &str) -> Result<ProxyConfig> {
    static PORT: OnceLock<Regex> = OnceLock::new();
    static SECRET: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    static WORKERS: OnceLock<Regex> = OnceLock::new();

    let exec_line = exec_start_re()
        .captures(content)
        .and_then(|c| c.get(1))
        .ok_or(Error::ConfigUnreadable)?
        .as_str();

    let port = field_re(r"-H (\d+)", &PORT)
        .captures(exec_line)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let mut secrets = Vec::new();
    for cap in field_re(r"-S (\S+)", &SECRET).captures_iter(exec_line) {
        let secret = Secret::from_str(&cap[1])?;
        if !secrets.contains(&secret) {
            secrets.push(secret);
        }
    }

    let tag = field_re(r"-P ([a-f0-9]{32})", &TAG)
        .captures(exec_line)
        .and_then(|c| Secret::from_str(&c[1]).ok());

    let tls_domain = field_re(r"-D (\S+)", &DOMAIN)
        .captures(exec_line)
        .map_or_else(|| Some(DEFAULT_TLS_DOMAIN.to_string()), |c| Some(c[1].to_string()));

    let workers = field_re(r"-M (\d+)", &WORKERS)
        .captures(exec_line)
        .and_then(|c| c[1].parse().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WORKERS);

    Ok(ProxyConfig {
        secrets,
        port,
        tag,
        tls_domain,
        workers,
    })
}

/// Render the full unit file for a [`ProxyConfig`], deterministically.
///
/// Field order is stable so re-rendering an unchanged config is
/// byte-identical, and `parse_unit` round-trips everything it encodes.
#[must_use]
pub fn render_unit(config: &ProxyConfig) -> String {
    let mut exec = format!("{PROXY_BINARY} -u nobody -H {}", config.port);
    for secret in &config.secrets {
        exec.push_str(&format!(" -S {secret}"));
    }
    if let Some(ref tag) = config.tag {
        exec.push_str(&format!(" -P {tag}"));
    }
    if let Some(ref domain) = config.tls_domain
        && !domain.is_empty()
    {
        exec.push_str(&format!(" -D {domain}"));
    }
    exec.push_str(&format!(
        " -M {} --aes-pwd proxy-secret proxy-multi.conf",
        config.workers
    ));

    format!(
        "[Unit]\n\
         Description=MTProxy\n\
         After=network.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         WorkingDirectory={PROXY_WORKDIR}\n\
         ExecStart={exec}\n\
         Restart=on-failure\n\
         StartLimitBurst=0\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}
