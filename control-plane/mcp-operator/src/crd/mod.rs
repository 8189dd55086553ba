pub mod mcp_server;
pub mod route;

pub use mcp_server::{
    Condition, ConditionStatus, ConditionType, MCPServer, MCPServerSpec,
    MCPServerStatus,
};
pub use route::Route;
