pub mod locks;
pub mod logging;
