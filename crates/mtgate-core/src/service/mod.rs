mod store;
mod unit;

pub use store::ServiceStore;
pub use unit::{
    DEFAULT_PORT, DEFAULT_TLS_DOMAIN, DEFAULT_WORKERS, ProxyConfig, parse_unit, render_unit,
};
