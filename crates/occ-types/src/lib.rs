pub mod config;
pub mod device;
pub mod errors;
pub mod probe;
pub mod report;

pub use config::*;
pub use device::*;
pub use errors::*;
pub use probe::*;
pub use report::*;
