pub mod config;
pub mod player;
pub mod rule;
pub mod tier;
