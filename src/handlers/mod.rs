//! 핸들러 모듈

pub mod connection;
pub mod matchmaking;
pub mod session;
pub mod signaling;

pub use connection::*;
pub use matchmaking::*;
pub use session::*;
pub use signaling::*;
