//! Wire types for the agent task protocol.
//!
//! Agents exchange units of work as [`Task`]s driven by [`TaskEvent`]
//! sequences over a JSON-RPC 2.0 transport, and advertise themselves with an
//! [`AgentCard`] served from a well-known path.

pub mod card;
pub mod event;
pub mod message;
pub mod rpc;
pub mod task;

pub use card::{AGENT_CARD_PATH, AgentCapabilities, AgentCard, AgentSkill};
pub use event::{TaskArtifactUpdateEvent, TaskEvent, TaskStatusUpdateEvent};
pub use message::{Message, Part, Role};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendParams, RequestId, TaskIdParams};
pub use task::{Artifact, Task, TaskState, TaskStatus};
