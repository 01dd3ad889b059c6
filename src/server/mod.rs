//! Agent service skeleton.
//!
//! An agent is an [`AgentExecutor`] implementation mounted behind the shared
//! HTTP surface: [`http::serve`] wires the executor to a [`RequestHandler`]
//! and a [`TaskStore`] and exposes the discovery and JSON-RPC routes.

pub mod executor;
pub mod handler;
pub mod http;
pub mod store;

pub use executor::{AgentExecutor, EventSink, RequestContext};
pub use handler::RequestHandler;
pub use http::{app, serve};
pub use store::TaskStore;
