pub mod args;
pub mod client;
pub mod config;
pub mod dataset;
pub mod error;
pub mod handlers;
pub mod outcome;
pub mod registry;
pub mod router;

pub use datawrapper_mcp_core as core;
pub use datawrapper_mcp_server as server;

pub use client::{ChartClient, ClientConfig, DatawrapperClient};
pub use error::{ChartError, ErrorKind, FieldError, RemoteFault};
pub use handlers::ChartOperations;
pub use registry::ChartTypeRegistry;
pub use router::ChartRouter;
