pub mod rtsp;
pub mod scanner;
pub mod verify;

pub use scanner::SubnetScanner;
pub use verify::verify_onvif_service;
