// config + builders + higher level helpers
pub mod builders;
pub mod config;
pub mod experiment;
pub mod logging;
pub mod utils;
