mod health;
mod url;

pub use health::ping_handler;
pub use url::{redirect_handler, shorten_handler};
