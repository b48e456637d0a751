//! Engine configuration.
//!
//! A plain, `Default`-able struct extracted from a layered
//! [`Figment`](figment::Figment), rather than read piecemeal from
//! process-wide globals at call sites.
//!
//! ```rust
//! use truss::config::Config;
//!
//! let figment = Config::figment();
//! let config = Config::from(&figment);
//! assert_eq!(config.server_header, "truss/0.1.0");
//! ```

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Provider};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// Maximum level of log messages to show; answers how chatty the installed
/// `tracing` subscriber should be.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    #[default]
    Normal,
    Debug,
    Off,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Critical => "critical",
            LogLevel::Normal => "normal",
            LogLevel::Debug => "debug",
            LogLevel::Off => "off",
        };
        write!(f, "{}", s)
    }
}

/// How aggressively the emitter should try to hand file bodies to the
/// kernel instead of copying them through userspace.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendfileMode {
    /// Never use `sendfile`; always read-and-write in chunks.
    Disabled,
    /// Use `sendfile` directly on the emitting task.
    #[default]
    InProcess,
    /// Hand the file descriptor to a dedicated blocking thread pool.
    Offload,
}

/// Which proxies are trusted to set `Forwarded`/`X-Forwarded-*` headers.
///
/// `IpList`'s CIDRs are carried inline on the variant rather than as a
/// separate top-level key; this keeps `proxy_trust` self-contained and
/// un-settable into an inconsistent pair (an `ip-list` policy with no list).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum ProxyTrust {
    /// Reject all proxy claims; always use the peer address directly.
    #[default]
    None,
    /// Accept proxy claims from any peer.
    Any,
    /// Accept proxy claims only from peers in RFC1918/loopback/link-local/
    /// ULA ranges.
    Local,
    /// Accept proxy claims only from peers matching one of these CIDRs.
    IpList {
        #[serde(default)]
        cidrs: Vec<IpNet>,
    },
}

impl ProxyTrust {
    /// Whether `peer` is permitted to set proxy headers under this policy.
    pub fn trusts(&self, peer: IpAddr) -> bool {
        match self {
            ProxyTrust::None => false,
            ProxyTrust::Any => true,
            ProxyTrust::Local => is_local(peer),
            ProxyTrust::IpList { cidrs } => cidrs.iter().any(|net| net.contains(&peer)),
        }
    }
}

fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unique_local()
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 link-local
        }
    }
}

/// Top-level engine configuration, extracted from a [`Figment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Value of the `Server` header the emitter adds when absent.
    pub server_header: String,
    /// How the emitter should serve file-backed bodies.
    pub use_sendfile: SendfileMode,
    /// Who may set proxy headers.
    pub proxy_trust: ProxyTrust,
    /// How long a connection may idle before the transport is expected to
    /// cancel it. `None` means no limit; purely advisory to the engine,
    /// which does not itself own a clock loop (the transport does).
    #[serde(with = "duration_secs", default)]
    pub idle_timeout: Option<Duration>,
    /// Chunk size used for non-sendfile file reads and for stream
    /// backpressure buffering.
    pub file_chunk_size: usize,
    /// Verbosity of the installed `tracing` subscriber.
    pub log_level: LogLevel,
    /// Whether the log formatter may emit ANSI color codes.
    pub cli_colors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_header: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
            use_sendfile: SendfileMode::default(),
            proxy_trust: ProxyTrust::default(),
            idle_timeout: None,
            file_chunk_size: 65_536,
            log_level: LogLevel::default(),
            cli_colors: true,
        }
    }
}

impl Config {
    /// The default provider chain: built-in defaults, then `Truss.toml`,
    /// then `TRUSS_`-prefixed environment variables (highest precedence).
    pub fn figment() -> Figment {
        Figment::from(Config::default())
            .merge(Toml::file("Truss.toml").nested())
            .merge(Env::prefixed("TRUSS_").global())
    }
}

impl Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        figment::Metadata::named("Truss Config")
    }

    fn data(&self) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}

impl From<&Figment> for Config {
    fn from(figment: &Figment) -> Self {
        figment.extract().unwrap_or_else(|e| {
            tracing::warn!("using default config: {e}");
            Config::default()
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| d.as_secs()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
