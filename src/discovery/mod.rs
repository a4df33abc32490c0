pub mod engine;
pub mod multicast;
pub mod parse;

pub use engine::DiscoveryEngine;
pub use multicast::{MulticastLock, NoopMulticastLock};
pub use parse::DeviceRegistry;
