pub mod api;
pub mod model;
pub mod poller;
pub mod registry;
pub mod variables;

pub use api::Error;
pub use poller::Poller;
