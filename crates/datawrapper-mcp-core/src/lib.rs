pub mod content;
pub mod protocol;
pub mod resource;
pub mod tool;
pub mod utils;

pub use datawrapper_mcp_error as error;
pub use protocol::result::{CallToolResult, InitializeResult};
pub use resource::{Resource, ResourceContents};
pub use tool::{Tool, ToolCall};
