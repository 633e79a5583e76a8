//! HTTP gateway: shortens long URLs and redirects short keys.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use config::Config;
pub use state::AppState;
