//! MCP protocol surfaces: the stdio server wrapping the operation catalogue,
//! and the child-process client the smoke-test commands drive it with.

pub mod client;
pub mod server;

pub use server::BridgeServer;
