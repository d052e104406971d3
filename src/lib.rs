// Library exports for the driver binary and integration tests

pub mod config;
pub mod driver;

pub use config::DriverConfig;
pub use driver::{DriverSession, HostCapabilities};
