//! PostgreSQL wire-protocol handling
//!
//! Only the startup phase is ever interpreted: discriminators, the parameter
//! block, and the fatal frames the proxy synthesizes. Post-startup traffic
//! is handled purely at the framing level by [`framer`].

pub mod constants;
pub mod framer;
pub mod startup;
