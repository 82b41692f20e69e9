//! Minimal HTTP/1.1 JSON server on a raw tokio listener
//!
//! One request per connection, bodies framed by `Content-Length`.

use crate::error::{BridgeError, Result};
use crate::service::{AskRequest, BridgeService, QueryRequest, ValidateRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(500, "INTERNAL_ERROR", &e.to_string()),
        }
    }

    fn error(status: u16, code: &str, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": code, "message": message }).to_string(),
        }
    }

    fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            status_text(self.status),
            self.body.len(),
            self.body
        )
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, service: Arc<BridgeService>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "server.listening");
    loop {
        let (stream, addr) = listener.accept().await?;
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, &service).await {
                warn!(%addr, error = %e, "connection.error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, addr: SocketAddr, service: &BridgeService) -> Result<()> {
    let response = match read_request(&mut stream).await {
        Ok(request) => {
            let request_id = Uuid::new_v4().to_string();
            let span = info_span!("request", %request_id, method = %request.method, path = %request.path, %addr);
            async {
                let response = route(service, &request).await;
                info!(status = response.status, "request.done");
                response
            }
            .instrument(span)
            .await
        }
        Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
            HttpResponse::error(400, "BAD_REQUEST", &e.to_string())
        }
        Err(e) => return Err(e),
    };

    stream.write_all(response.to_http().as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

fn invalid(message: impl Into<String>) -> BridgeError {
    BridgeError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, message.into()))
}

/// Read the request line, headers and a `Content-Length` body.
pub async fn read_request<R: AsyncRead + Unpin>(stream: R) -> Result<HttpRequest> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or_else(|| invalid("empty request line"))?.to_string();
    let target = parts.next().ok_or_else(|| invalid("missing request target"))?;
    let path = target.split('?').next().unwrap_or(target);
    let path = match path.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    };

    let mut content_length = 0usize;
    let mut header_bytes = 0usize;
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        header_bytes += n;
        if header_bytes > MAX_HEADER_BYTES {
            return Err(invalid("headers too large"));
        }
        let header = line.trim_end();
        if n == 0 || header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("invalid Content-Length: {}", value.trim())))?;
            }
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Err(invalid("request body too large"));
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(HttpRequest { method, path, body })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> std::result::Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|e| HttpResponse::error(400, "INVALID_JSON", &e.to_string()))
}

fn internal(e: BridgeError) -> HttpResponse {
    error!(error = %e, "request.failed");
    HttpResponse::error(500, "INTERNAL_ERROR", &e.to_string())
}

pub async fn route(service: &BridgeService, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => HttpResponse {
            status: 204,
            body: String::new(),
        },
        ("GET", "/health") => HttpResponse::json(200, &json!({ "ok": true })),
        ("GET", "/v1/meta/schema") => match service.schema().await {
            Ok(schema) => HttpResponse::json(200, &schema),
            Err(e) => internal(e),
        },
        ("GET", "/v1/demo/top-products") => match service.demo_top_products().await {
            Ok(demo) => HttpResponse::json(200, &demo),
            Err(e) => {
                error!(error = %e, "db.error");
                HttpResponse::error(500, "SQL_EXECUTION_FAILED", &e.to_string())
            }
        },
        ("POST", "/v1/sql/validate") => {
            let body: ValidateRequest = match parse_body(&request.body) {
                Ok(body) => body,
                Err(response) => return response,
            };
            match service.validate_sql(&body.sql).await {
                Ok(outcome) => HttpResponse::json(200, &outcome),
                Err(e) => internal(e),
            }
        }
        ("POST", "/v1/sql/query") => {
            let body: QueryRequest = match parse_body(&request.body) {
                Ok(body) => body,
                Err(response) => return response,
            };
            match service.query_sql(&body).await {
                Ok(outcome) => HttpResponse::json(outcome.status_code(), &outcome),
                Err(e) => internal(e),
            }
        }
        ("POST", "/v1/ask") => {
            let body: AskRequest = match parse_body(&request.body) {
                Ok(body) => body,
                Err(response) => return response,
            };
            if body.question.trim().is_empty() {
                return HttpResponse::error(400, "INVALID_REQUEST", "question is required");
            }
            match service.ask(&body).await {
                Ok(outcome) => HttpResponse::json(outcome.status_code(), &outcome),
                Err(e) => internal(e),
            }
        }
        _ => HttpResponse::error(404, "NOT_FOUND", &format!("No route for {} {}", request.method, request.path)),
    }
}
