//! Server runtime: one search operation exposed over HTTP and
//! line-delimited JSON-RPC on stdio.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use schemars::schema::RootSchema;
use schemars::schema_for;
use seeker_core::{
    model::{SearchOptions, SearchResult},
    traits::{ContentStore, MetadataStore},
    validate::sanitize_keyword,
    SearchError, ValidationError,
};
use seeker_engine::Seeker;
use seeker_proto as proto;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub search: SearchOptions,
    /// Upper bound for one search, store calls included.
    pub timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

pub struct Server<C, M> {
    seeker: Seeker<C, M>,
    timeout: Duration,
}

impl<C, M> Clone for Server<C, M> {
    fn clone(&self) -> Self {
        Self {
            seeker: self.seeker.clone(),
            timeout: self.timeout,
        }
    }
}

impl<C, M> Server<C, M>
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(content: C, metadata: M) -> Self {
        Self::new_with_options(Arc::new(content), Arc::new(metadata), ServerOptions::default())
    }

    #[must_use]
    pub fn new_with_options(content: Arc<C>, metadata: Arc<M>, options: ServerOptions) -> Self {
        Self {
            seeker: Seeker::with_options(content, metadata, options.search),
            timeout: options.timeout,
        }
    }

    pub fn seeker(&self) -> &Seeker<C, M> {
        &self.seeker
    }

    /// Sanitize an untrusted keyword and run the search on the blocking pool.
    /// Exceeding the timeout is reported as an unavailable store labelled
    /// `search`, since either matcher may be the one still running.
    pub async fn search(&self, raw_keyword: &str) -> Result<Vec<SearchResult>, SearchError> {
        let keyword = sanitize_keyword(raw_keyword, self.seeker.options().max_keyword_chars);
        let keyword_preview: String = keyword.chars().take(64).collect();
        debug!(
            keyword_preview = %keyword_preview,
            keyword_len = keyword.chars().count(),
            "search request"
        );
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let seeker = self.seeker.clone();
        let task = tokio::task::spawn_blocking(move || seeker.search(&keyword));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(res)) => res,
            Ok(Err(join_err)) => Err(SearchError::StoreUnavailable {
                store: "search",
                reason: join_err.to_string(),
            }),
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "search timed out");
                Err(SearchError::StoreUnavailable {
                    store: "search",
                    reason: format!("timed out after {} ms", self.timeout.as_millis()),
                })
            }
        }
    }

    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let method_name = req.method.clone();
        let id_repr = req.id.as_ref().map(|v| v.to_string());
        debug!(method = %method_name, id = %id_repr.as_deref().unwrap_or("null"), "handling JSON-RPC request");
        match proto::canonical_method_name(&req.method) {
            Some(proto::METHOD_SEEK_POSTS) => self.handle_seek(req).await,
            Some(proto::METHOD_METHODS_LIST) => handle_methods_list(req),
            _ => {
                debug!(method = %method_name, "unknown method");
                JsonRpcResponse {
                    jsonrpc: "2.0",
                    id: req.id,
                    result: None,
                    error: Some(JsonRpcError {
                        code: -32601,
                        message: "Method not found".into(),
                        data: None,
                    }),
                }
            }
        }
    }

    async fn handle_seek(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let idv = req.id.clone();
        let params: proto::SeekParams = match parse_params(req.params) {
            Ok(p) => p,
            Err(e) => return invalid_params(idv, e),
        };
        let keyword = match params.keyword() {
            Ok(k) => k,
            Err(e) => return invalid_params(idv, e.to_string()),
        };
        match self.search(keyword).await {
            Ok(results) => JsonRpcResponse {
                jsonrpc: "2.0",
                id: idv,
                result: Some(json!(proto::encode_results(&results))),
                error: None,
            },
            Err(SearchError::InvalidInput(e)) => invalid_params(idv, e.to_string()),
            Err(e) => search_error_response(idv, &e),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/admin-ajax", post(seek_form::<C, M>))
            .route("/search", post(seek_json::<C, M>))
            .route("/rpc", post(rpc::<C, M>))
            .with_state(self.clone())
    }

    pub async fn run_stdio(&self) -> Result<(), ServerError> {
        info!("server running (stdio json-rpc)");
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ServerError::Io(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }
            let Some(resp) = self.handle_line(&line).await else {
                continue;
            };
            let mut out =
                serde_json::to_string(&resp).map_err(|e| ServerError::Parse(e.to_string()))?;
            out.push('\n');
            stdout
                .write_all(out.as_bytes())
                .await
                .map_err(|e| ServerError::Io(e.to_string()))?;
            stdout
                .flush()
                .await
                .map_err(|e| ServerError::Io(e.to_string()))?;
        }
        info!("stdin closed; stdio server exiting");
        Ok(())
    }

    /// `None` for notifications, which get no reply.
    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => return Some(parse_error(e.to_string())),
        };
        let is_notification = req.id.is_none();
        let resp = self.handle_request(req).await;
        (!is_notification).then_some(resp)
    }

    pub async fn run_http(&self, addr: &str) -> Result<(), ServerError> {
        let bind_addr: SocketAddr = addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::Io(e.to_string()))?;
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::Io(e.to_string()))?;

        let shutdown_token = CancellationToken::new();
        let server_shutdown = shutdown_token.child_token();
        info!(%addr, "http server listening");
        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                server_shutdown.cancelled().await;
            })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            res = &mut server => {
                res.map_err(|e| ServerError::Io(e.to_string()))
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl_c received; shutting down http server");
                shutdown_token.cancel();
                server.as_mut().await.map_err(|e| ServerError::Io(e.to_string()))
            }
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"ok": true}))
}

async fn seek_form<C, M>(
    State(server): State<Server<C, M>>,
    Form(form): Form<proto::AjaxForm>,
) -> Response
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    if form.action.as_deref() != Some(proto::AJAX_ACTION_SEEK_POSTS) {
        let action = form.action.unwrap_or_default();
        return http_error(
            StatusCode::BAD_REQUEST,
            "E_VALIDATION",
            &format!("unknown action '{action}'"),
        );
    }
    let Some(keyword) = form.keyword else {
        return http_validation_error(ValidationError::MissingKeyword);
    };
    http_search(&server, &keyword).await
}

async fn seek_json<C, M>(
    State(server): State<Server<C, M>>,
    Json(body): Json<serde_json::Value>,
) -> Response
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    let params: proto::SeekParams = match parse_params(Some(body)) {
        Ok(p) => p,
        Err(e) => return http_error(StatusCode::BAD_REQUEST, "E_VALIDATION", &e),
    };
    match params.keyword() {
        Ok(keyword) => http_search(&server, keyword).await,
        Err(e) => http_validation_error(e),
    }
}

async fn rpc<C, M>(
    State(server): State<Server<C, M>>,
    Json(body): Json<serde_json::Value>,
) -> Response
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    let resp = match serde_json::from_value::<JsonRpcRequest>(body) {
        Ok(req) => server.handle_request(req).await,
        Err(e) => parse_error(e.to_string()),
    };
    Json(resp).into_response()
}

async fn http_search<C, M>(server: &Server<C, M>, keyword: &str) -> Response
where
    C: ContentStore + Send + Sync + 'static,
    M: MetadataStore + Send + Sync + 'static,
{
    match server.search(keyword).await {
        Ok(results) => Json(proto::encode_results(&results)).into_response(),
        Err(SearchError::InvalidInput(e)) => http_validation_error(e),
        Err(e) => {
            error!(error = %e, "search failed");
            http_error(StatusCode::SERVICE_UNAVAILABLE, e.code(), &e.to_string())
        }
    }
}

fn http_validation_error(err: ValidationError) -> Response {
    http_error(StatusCode::BAD_REQUEST, "E_VALIDATION", &err.to_string())
}

fn http_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

fn parse_params<T: for<'de> Deserialize<'de>>(v: Option<serde_json::Value>) -> Result<T, String> {
    let value = match v {
        None | Some(serde_json::Value::Null) => json!({}),
        Some(serde_json::Value::Array(items)) if items.is_empty() => json!({}),
        Some(other) => other,
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn handle_methods_list(req: JsonRpcRequest) -> JsonRpcResponse {
    match build_method_definitions() {
        Ok(methods) => JsonRpcResponse {
            jsonrpc: "2.0",
            id: req.id,
            result: Some(json!(proto::ListMethodsResult { methods })),
            error: None,
        },
        Err(e) => internal_error(req.id, &e.to_string()),
    }
}

fn build_method_definitions() -> Result<Vec<proto::MethodDefinition>, ServerError> {
    Ok(vec![proto::MethodDefinition {
        name: proto::METHOD_SEEK_POSTS.to_string(),
        description: Some(
            "Find content whose text or metadata contains a keyword (case-insensitive).".into(),
        ),
        params_schema: root_schema_to_value(schema_for!(proto::SeekParams))?,
        result_schema: root_schema_to_value(schema_for!(Vec<proto::SearchResultWire>))?,
    }])
}

fn root_schema_to_value(schema: RootSchema) -> Result<serde_json::Value, ServerError> {
    serde_json::to_value(schema).map_err(|e| ServerError::Parse(e.to_string()))
}

fn parse_error(msg: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id: None,
        result: None,
        error: Some(JsonRpcError {
            code: -32700,
            message: "Parse error".into(),
            data: Some(json!({"message": msg})),
        }),
    }
}

fn internal_error(id: Option<serde_json::Value>, msg: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32603,
            message: "Internal error".into(),
            data: Some(json!({"code": "E_INTERNAL", "message": msg})),
        }),
    }
}

fn invalid_params(id: Option<serde_json::Value>, msg: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32602,
            message: "Invalid params".into(),
            data: Some(json!({"code": "E_VALIDATION", "message": msg})),
        }),
    }
}

fn search_error_response(id: Option<serde_json::Value>, err: &SearchError) -> JsonRpcResponse {
    error!(error = %err, "search failed");
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code: -32000,
            message: err.to_string(),
            data: Some(json!({"code": err.code()})),
        }),
    }
}
