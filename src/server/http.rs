//! HTTP surface for an agent service.
//!
//! Every agent exposes the same two routes: the agent card on the well-known
//! discovery path, and a JSON-RPC endpoint at the root accepting
//! `message/send`, `message/stream`, `tasks/get` and `tasks/cancel`.
//! `message/stream` responds with server-sent events, one JSON-RPC response
//! per task event.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::error::{Result, ServerError};
use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
    rpc::{METHOD_MESSAGE_SEND, METHOD_MESSAGE_STREAM, METHOD_TASKS_CANCEL, METHOD_TASKS_GET},
};
use crate::server::executor::AgentExecutor;
use crate::server::handler::RequestHandler;
use crate::server::store::TaskStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub card: AgentCard,
    pub handler: Arc<RequestHandler>,
}

/// Build the router for one agent service.
pub fn app(card: AgentCard, executor: Arc<dyn AgentExecutor>) -> Router {
    let store = Arc::new(TaskStore::new());
    let state = AppState {
        card,
        handler: Arc::new(RequestHandler::new(executor, store)),
    };

    Router::new()
        .route(AGENT_CARD_PATH, get(agent_card))
        .route("/", post(rpc))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the address and serve the agent until the process exits.
pub async fn serve(card: AgentCard, executor: Arc<dyn AgentExecutor>, addr: SocketAddr) -> Result<()> {
    let name = card.name.clone();
    let app = app(card, executor);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    info!(agent = %name, %addr, "agent service listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Startup(e.to_string()))?;
    Ok(())
}

// ── Discovery ───────────────────────────────────────────────────────────

async fn agent_card(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.card.clone())
}

// ── JSON-RPC ────────────────────────────────────────────────────────────

async fn rpc(State(state): State<AppState>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejecting unparseable rpc request");
            return Json(JsonRpcResponse::error(
                None,
                JsonRpcError::parse_error(e.to_string()),
            ))
            .into_response();
        }
    };
    let id = request.id.clone();
    debug!(method = %request.method, "rpc request");

    match request.method.as_str() {
        METHOD_MESSAGE_SEND => {
            let params = match decode_params(&request) {
                Ok(params) => params,
                Err(e) => return error_response(id, e),
            };
            match state.handler.message_send(params).await {
                Ok(task) => success_response(id, &task),
                Err(e) => error_response(id, e),
            }
        }
        METHOD_MESSAGE_STREAM => {
            let params = match decode_params(&request) {
                Ok(params) => params,
                Err(e) => return error_response(id, e),
            };
            let events = state.handler.message_stream(params).await;
            let stream = UnboundedReceiverStream::new(events).map(move |event| {
                let response = match serde_json::to_value(&event) {
                    Ok(value) => JsonRpcResponse::success(id.clone(), value),
                    Err(e) => JsonRpcResponse::error(id.clone(), JsonRpcError::internal(e.to_string())),
                };
                let data =
                    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
                Ok::<_, Infallible>(SseEvent::default().data(data))
            });
            Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
        }
        METHOD_TASKS_GET => {
            let params = match decode_params(&request) {
                Ok(params) => params,
                Err(e) => return error_response(id, e),
            };
            match state.handler.tasks_get(params).await {
                Ok(task) => success_response(id, &task),
                Err(e) => error_response(id, e),
            }
        }
        METHOD_TASKS_CANCEL => {
            let params = match decode_params(&request) {
                Ok(params) => params,
                Err(e) => return error_response(id, e),
            };
            match state.handler.tasks_cancel(params).await {
                Ok(task) => success_response(id, &task),
                Err(e) => error_response(id, e),
            }
        }
        other => error_response(id, JsonRpcError::method_not_found(other)),
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(
    request: &JsonRpcRequest,
) -> std::result::Result<T, JsonRpcError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| JsonRpcError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn success_response<T: serde::Serialize>(id: Option<RequestId>, result: &T) -> Response {
    match serde_json::to_value(result) {
        Ok(value) => Json(JsonRpcResponse::success(id, value)).into_response(),
        Err(e) => error_response(id, JsonRpcError::internal(e.to_string())),
    }
}

fn error_response(id: Option<RequestId>, error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::error(id, error)).into_response()
}
