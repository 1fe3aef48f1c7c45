pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod warden;

pub use warden::{Warden, WardenError};
