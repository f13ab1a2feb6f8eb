//! Voice interview calls: the call-state machine, the SDK boundary and the
//! HTTP relay that lets a browser-side SDK drive a server-side bridge.

pub mod bridge;
pub mod relay;
pub mod sdk;
pub mod session;

pub use relay::VoiceSessions;
