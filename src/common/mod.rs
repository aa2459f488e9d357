pub mod clock;
pub mod dispatch;
pub mod error;
pub mod recipients;
pub mod signer;
pub mod types;
pub mod verify;
