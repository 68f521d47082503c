use crate::{cache, proxy_pool::Proxy, relay, resolver};
use std::env;
use std::str::FromStr;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Upstream extraction endpoint queried as `GET {extractor_url}?id=<id>`
    pub extractor_url: Url,
    /// Egress proxies used for resolution, in rotation order
    pub proxies: Vec<Proxy>,
    /// Resolved URL lifetime in seconds (default: 3600)
    pub cache_ttl_secs: u64,
    /// Background purge interval in seconds; 0 disables the sweeper (default: 300)
    pub cache_sweep_interval_secs: u64,
    /// Per-attempt resolution timeout in seconds (default: 10)
    pub resolve_timeout_secs: u64,
    /// Relay chunk size in bytes (default: 4096)
    pub relay_chunk_size: usize,
    /// Bound on a single upstream relay read in seconds (default: 30)
    pub relay_read_timeout_secs: u64,
    /// Allow relaying from loopback/private addresses
    pub relay_allow_private: bool,
    /// Upstream catalog base URL; catalog routes fail when unset
    pub catalog_url: Option<Url>,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, PORT and EXTRACTOR_URL have defaults; in PROD they are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port: u16 = match env::var("PORT") {
            Ok(p) => p.parse()?,
            Err(_) if is_dev => 3000,
            Err(_) => return Err("PORT is required in production".into()),
        };

        let extractor_url = match env::var("EXTRACTOR_URL") {
            Ok(u) => Url::parse(&u).map_err(|e| format!("invalid EXTRACTOR_URL '{u}': {e}"))?,
            Err(_) if is_dev => Url::parse("http://127.0.0.1:8000/resolve")?,
            Err(_) => return Err("EXTRACTOR_URL is required in production".into()),
        };

        let proxies = parse_proxy_list(&env::var("PROXY_LIST").unwrap_or_default())?;

        let catalog_url = match env::var("CATALOG_URL") {
            Ok(u) if !u.trim().is_empty() => Some(
                Url::parse(u.trim()).map_err(|e| format!("invalid CATALOG_URL '{u}': {e}"))?,
            ),
            _ => None,
        };

        Ok(Config {
            port,
            is_dev,
            extractor_url,
            proxies,
            cache_ttl_secs: env_or("CACHE_TTL_SECS", cache::DEFAULT_TTL.as_secs()),
            cache_sweep_interval_secs: env_or("CACHE_SWEEP_INTERVAL_SECS", 300),
            resolve_timeout_secs: env_or(
                "RESOLVE_TIMEOUT_SECS",
                resolver::DEFAULT_ATTEMPT_TIMEOUT.as_secs(),
            ),
            relay_chunk_size: env_or("RELAY_CHUNK_SIZE", relay::DEFAULT_CHUNK_SIZE).max(1),
            relay_read_timeout_secs: env_or(
                "RELAY_READ_TIMEOUT_SECS",
                relay::DEFAULT_READ_TIMEOUT.as_secs(),
            ),
            relay_allow_private: env_or("RELAY_ALLOW_PRIVATE", false),
            catalog_url,
        })
    }
}

/// Parse a comma-separated proxy list. Blank entries are skipped; any
/// malformed entry fails the whole list.
pub fn parse_proxy_list(raw: &str) -> Result<Vec<Proxy>, Box<dyn std::error::Error>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            Proxy::parse(entry)
                .map_err(|e| -> Box<dyn std::error::Error> { format!("PROXY_LIST: {e}").into() })
        })
        .collect()
}

/// Parse an optional variable, falling back to `default` when unset or invalid.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialize all env-var tests to prevent races between parallel test threads.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "DEV_MODE",
        "PORT",
        "EXTRACTOR_URL",
        "PROXY_LIST",
        "CACHE_TTL_SECS",
        "CACHE_SWEEP_INTERVAL_SECS",
        "RESOLVE_TIMEOUT_SECS",
        "RELAY_CHUNK_SIZE",
        "RELAY_READ_TIMEOUT_SECS",
        "RELAY_ALLOW_PRIVATE",
        "CATALOG_URL",
    ];

    /// Clear every config var, apply `set`, run `f`, then restore.
    fn with_env(set: &[(&str, &str)], f: impl FnOnce()) {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        // SAFETY: serialized by ENV_LOCK; no other thread touches the environment.
        for k in ALL_VARS {
            unsafe { env::remove_var(k) };
        }
        for (k, v) in set {
            unsafe { env::set_var(k, v) };
        }

        f();

        for (k, old) in saved {
            match old {
                Some(v) => unsafe { env::set_var(k, v) },
                None => unsafe { env::remove_var(k) },
            }
        }
    }

    #[test]
    fn dev_mode_uses_defaults() {
        with_env(&[("DEV_MODE", "true")], || {
            let config = Config::from_env().expect("should succeed in dev mode");
            assert!(config.is_dev);
            assert_eq!(config.port, 3000);
            assert_eq!(config.extractor_url.as_str(), "http://127.0.0.1:8000/resolve");
            assert!(config.proxies.is_empty());
            assert_eq!(config.cache_ttl_secs, 3600);
            assert_eq!(config.cache_sweep_interval_secs, 300);
            assert_eq!(config.resolve_timeout_secs, 10);
            assert_eq!(config.relay_chunk_size, 4096);
            assert_eq!(config.relay_read_timeout_secs, 30);
            assert!(!config.relay_allow_private);
            assert!(config.catalog_url.is_none());
        });
    }

    #[test]
    fn prod_mode_requires_port() {
        with_env(&[("EXTRACTOR_URL", "https://x.example.com/r")], || {
            assert!(Config::from_env().is_err(), "Should fail without PORT");
        });
    }

    #[test]
    fn prod_mode_requires_extractor_url() {
        with_env(&[("PORT", "8080")], || {
            assert!(
                Config::from_env().is_err(),
                "Should fail without EXTRACTOR_URL"
            );
        });
    }

    #[test]
    fn parses_proxy_list_in_order() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                (
                    "PROXY_LIST",
                    " http://10.0.0.1:8080, ,socks5://u:p@10.0.0.2:1080 ",
                ),
            ],
            || {
                let config = Config::from_env().unwrap();
                let hosts: Vec<&str> = config.proxies.iter().map(|p| p.host.as_str()).collect();
                assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2"]);
                assert_eq!(
                    config.proxies[1].credentials,
                    Some(("u".to_string(), "p".to_string()))
                );
            },
        );
    }

    #[test]
    fn malformed_proxy_fails_startup() {
        with_env(
            &[("DEV_MODE", "true"), ("PROXY_LIST", "http://ok:1,gopher://bad:2")],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn numeric_overrides_and_bad_values_fall_back() {
        with_env(
            &[
                ("DEV_MODE", "true"),
                ("CACHE_TTL_SECS", "60"),
                ("RESOLVE_TIMEOUT_SECS", "soon"),
                ("RELAY_CHUNK_SIZE", "0"),
                ("RELAY_ALLOW_PRIVATE", "true"),
                ("CATALOG_URL", "https://catalog.example.com/api"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.cache_ttl_secs, 60);
                assert_eq!(config.resolve_timeout_secs, 10);
                assert_eq!(config.relay_chunk_size, 1);
                assert!(config.relay_allow_private);
                assert_eq!(
                    config.catalog_url.unwrap().as_str(),
                    "https://catalog.example.com/api"
                );
            },
        );
    }
}
