mod admin_key;
mod admin_routes;
pub mod config;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;

pub use admin_key::ADMIN_KEY_HEADER;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
