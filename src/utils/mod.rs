pub mod app_config;
mod error;
pub mod logging;
pub mod panic;

pub mod prelude {
    pub use super::app_config::prelude::*;
    pub use super::error::{Error, Result};
    pub use super::logging::prelude::*;
}
