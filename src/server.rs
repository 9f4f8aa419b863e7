//! JSON endpoint: `POST /predict/` with `{"first_pokemon": 4, "second_pokemon": 7}`.

use crate::context::BattleContext;
use crate::error::PredictError;
use crate::model::PokemonId;
use crate::outcome::{BattleRecord, OutcomeLog};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

pub const PREDICT_PATH: &str = "/predict/";

/// Larger request bodies are rejected before they are buffered.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Problems with the request body. All of them are the caller's fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("Missing field {0}")]
    MissingField(&'static str),
    #[error("Field {0} must be an integer")]
    NotAnInteger(&'static str),
    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("Failed to read request body: {0}")]
    Unreadable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictRequest {
    pub first_pokemon: PokemonId,
    pub second_pokemon: PokemonId,
}

impl PredictRequest {
    /// Ids may be JSON integers, whole-valued numbers such as `4.0`, or integer strings such as `"4"`.
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| RequestError::InvalidJson(e.to_string()))?;
        let object = value.as_object().ok_or(RequestError::NotAnObject)?;
        Ok(PredictRequest {
            first_pokemon: id_field(object, "first_pokemon")?,
            second_pokemon: id_field(object, "second_pokemon")?,
        })
    }
}

fn id_field(object: &Map<String, Value>, field: &'static str) -> Result<PokemonId, RequestError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(RequestError::MissingField(field)),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_number))
            .ok_or(RequestError::NotAnInteger(field)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| RequestError::NotAnInteger(field)),
        Some(_) => Err(RequestError::NotAnInteger(field)),
    }
}

fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Buffers the body, refusing anything over [`MAX_BODY_BYTES`].
pub async fn read_body<B>(body: B) -> Result<Bytes, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RequestError::BodyTooLarge(MAX_BODY_BYTES)),
        Err(e) => Err(RequestError::Unreadable(e.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            body,
        }
    }

    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body.to_string())));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// The battle context plus the optional outcome log, shared by all connections.
pub struct PredictService {
    context: BattleContext,
    outcomes: Option<Box<dyn OutcomeLog>>,
}

impl PredictService {
    pub fn new(context: BattleContext, outcomes: Option<Box<dyn OutcomeLog>>) -> Self {
        PredictService { context, outcomes }
    }

    /// Routes one request. Never panics on bad input; every failure becomes a JSON error.
    pub fn handle(&self, method: &Method, path: &str, body: &[u8]) -> ApiResponse {
        if path != PREDICT_PATH && path != PREDICT_PATH.trim_end_matches('/') {
            return ApiResponse::error(StatusCode::NOT_FOUND, "Not found");
        }
        if *method != Method::POST {
            return ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid request");
        }
        let request = match PredictRequest::parse(body) {
            Ok(r) => r,
            Err(e) => {
                log::debug!("Rejected predict request: {e}");
                return ApiResponse::error(StatusCode::BAD_REQUEST, e.to_string());
            }
        };
        self.predict(request)
    }

    fn predict(&self, request: PredictRequest) -> ApiResponse {
        let PredictRequest {
            first_pokemon,
            second_pokemon,
        } = request;
        match self.context.predict(first_pokemon, second_pokemon) {
            Ok(prediction) => {
                if let Some(outcomes) = &self.outcomes {
                    if let Err(e) = outcomes.record(&BattleRecord::from(&prediction)) {
                        log::warn!("Failed to record battle outcome: {e:#}");
                    }
                }
                ApiResponse::ok(json!({
                    "winner_id": prediction.winner_id,
                    "winner_name": prediction.winner_name,
                }))
            }
            Err(e @ PredictError::UnknownPokemon(id)) => {
                log::debug!("Unknown Pokemon id {id} in {first_pokemon} vs {second_pokemon}");
                ApiResponse::error(StatusCode::BAD_REQUEST, e.to_string())
            }
            Err(e) => {
                log::error!("Prediction {first_pokemon} vs {second_pokemon} failed: {e}");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

async fn handle_request(
    service: Arc<PredictService>,
    remote_addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    log::debug!("{remote_addr} {method} {path}");

    let body = match read_body(req.into_body()).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Rejected request body from {remote_addr}: {e}");
            return Ok(ApiResponse::error(StatusCode::BAD_REQUEST, e.to_string()).into_response());
        }
    };

    let response = service.handle(&method, &path, &body);
    log::info!("{method} {path} -> {}", response.status.as_u16());
    Ok(response.into_response())
}

/// Accepts connections until the task is dropped.
pub async fn serve(listener: TcpListener, service: Arc<PredictService>) -> anyhow::Result<()> {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("Accept error: {e}");
                continue;
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let handler = service_fn(move |req| {
                let service = service.clone();
                async move { handle_request(service, remote_addr, req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                log::debug!("Connection error from {remote_addr}: {e}");
            }
        });
    }
}
