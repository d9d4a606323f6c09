pub mod agents;
pub mod db;
pub mod error;
pub mod models;
pub mod scraper;
pub mod session;
pub mod settings;
pub mod timer;
pub mod utils;
pub mod voice;

pub use error::CoreError;
