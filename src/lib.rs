pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http_retry;
pub mod metrics;
pub mod proxy_pool;
pub mod relay;
pub mod resolver;
pub mod server;
pub mod stream;
