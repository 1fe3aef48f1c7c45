pub mod aggregate;
pub mod console;
pub mod gate;
pub mod messages;
pub mod playtime;
pub mod server;
