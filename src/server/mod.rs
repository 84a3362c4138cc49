//! Listener, sessions, and relay plumbing

mod listener;
mod relay;
mod session;
mod stream;

pub use listener::{Listener, ListenerStats};
pub use relay::relay_half;
pub use session::Session;
pub use stream::NetworkStream;
