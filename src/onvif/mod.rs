pub mod auth;
pub mod client;
pub mod device;
pub mod media;
pub mod resolver;
pub mod soap;

pub use client::OnvifClient;
pub use resolver::StreamResolver;
