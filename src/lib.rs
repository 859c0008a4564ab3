pub mod api;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod service;

pub trait Located {
    fn location(&self) -> snafu::Location;
}
