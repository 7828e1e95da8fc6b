pub mod ports;
pub mod registry;
pub mod usecases;
pub mod watch_list;

pub use ports::*;
pub use registry::WatcherRegistry;
pub use watch_list::{AddOutcome, WatchList};
