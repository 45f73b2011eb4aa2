pub mod router;
pub mod server;
pub mod transport;

pub use datawrapper_mcp_core as core;
pub use datawrapper_mcp_error as error;
pub use router::{capabilities::CapabilitiesBuilder, ext::RouterExt, traits::Router};
pub use server::Server;
