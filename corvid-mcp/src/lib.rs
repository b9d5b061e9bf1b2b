#![deny(missing_docs)]
//! JSON-RPC tool-provider client (C4) and registry bootstrapping.
//!
//! Implements a subset of a request/response RPC protocol over two
//! transports — HTTP request/response and line-delimited stdio — each
//! speaking `initialize -> tools/list -> tools/call`. [`bootstrap_registry`]
//! composes this with `corvid_tool`'s built-ins and user-declared tools
//! into one materialized [`corvid_tool::ToolRegistry`].

pub mod bootstrap;
pub mod envelope;
pub mod http_session;
pub mod stdio_session;
pub mod tool_wrapper;
pub mod transport;

pub use bootstrap::bootstrap_registry;
pub use http_session::HttpRpcSession;
pub use stdio_session::StdioRpcSession;
pub use tool_wrapper::RemoteToolWrapper;
pub use transport::RpcTransport;
