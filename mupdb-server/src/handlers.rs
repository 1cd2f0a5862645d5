//! HTTP request handlers for the multipart upload API

use hyper::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};
use mupdb_core::*;
use crate::server::{simple_response, AppState};

type BoxBody = http_body_util::Full<bytes::Bytes>;

/// Page size used when a list request carries no explicit max
const DEFAULT_LIST_MAX: usize = 1000;

/// Main request handler
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path();

    debug!("Handling {} {}", method, path);

    let result = match (&method, path) {
        // Health check endpoint
        (&Method::GET, "/health") => handle_health(&state).await,

        // Multipart upload endpoints
        (&Method::POST, "/v1/uploads") => handle_create(req, &state).await,
        (&Method::GET, "/v1/uploads") => handle_list(&state, uri.query()).await,
        (&Method::GET, path) if path.starts_with("/v1/uploads/") => {
            match parse_upload_path(path) {
                Some(UploadPath::Upload(id)) => handle_get(&state, &id).await,
                _ => bad_request("Expected /v1/uploads/{id}"),
            }
        }
        (&Method::PUT, path) if path.starts_with("/v1/uploads/") => {
            match parse_upload_path(path) {
                Some(UploadPath::Parts(id)) => handle_append(req, &state, &id).await,
                _ => bad_request("Expected /v1/uploads/{id}/parts"),
            }
        }
        (&Method::DELETE, path) if path.starts_with("/v1/uploads/") => {
            match parse_upload_path(path) {
                Some(UploadPath::Upload(id)) => handle_remove(&state, &id).await,
                _ => bad_request("Expected /v1/uploads/{id}"),
            }
        }

        // Not found
        _ => simple_response(
            StatusCode::NOT_FOUND,
            json!({"error": "Not found"}).to_string(),
        ),
    };

    match &result {
        Ok(response) => info!("{} {} -> {}", method, path, response.status()),
        Err(e) => error!("Handler error for {} {}: {}", method, path, e),
    }
    result
}

/// Health check handler
async fn handle_health(state: &AppState) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    simple_response(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "version": "0.1.0",
            "service": "mupdb",
            "uploads": state.partition.upload_count()
        })
        .to_string(),
    )
}

/// Create upload handler
async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let body_bytes = req.collect().await?.to_bytes();
    let create: CreateUploadRequest = match serde_json::from_slice(&body_bytes) {
        Ok(create) => create,
        Err(e) => return bad_request(format!("Invalid create body: {}", e)),
    };

    // The timestamp is decided here, once, and travels in the command
    // payload; replicas must never stamp their own clocks during apply
    let init_time = chrono::Utc::now().timestamp();

    debug!("Creating upload: path={}", create.path);

    match state.gateway.create_upload(&create.path, init_time) {
        Ok(id) => {
            if let Err(e) = state.partition.snapshot() {
                error!("Snapshot after create failed: {}", e);
                return error_response(&e);
            }
            let response = CreateUploadResponse {
                id: id.to_string(),
                path: create.path,
            };
            simple_response(StatusCode::CREATED, json!(response).to_string())
        }
        Err(e) => {
            error!("Failed to create upload: {}", e);
            error_response(&e)
        }
    }
}

/// Append part handler
async fn handle_append(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    id: &UploadId,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let body_bytes = req.collect().await?.to_bytes();

    // A request carrying no part is a no-op success
    if body_bytes.is_empty() {
        return simple_response(StatusCode::OK, json!({}).to_string());
    }

    let part: PartInfo = match serde_json::from_slice(&body_bytes) {
        Ok(part) => part,
        Err(e) => return bad_request(format!("Invalid part body: {}", e)),
    };

    debug!("Appending part: upload={}, part={}", id, part.id);

    match state.gateway.append_part(id, Part::from(part)) {
        Ok(()) => {
            if let Err(e) = state.partition.snapshot() {
                error!("Snapshot after append failed: {}", e);
                return error_response(&e);
            }
            simple_response(StatusCode::OK, json!({}).to_string())
        }
        Err(e) => error_response(&e),
    }
}

/// Remove upload handler. Idempotent: removing twice reports success twice.
async fn handle_remove(state: &AppState, id: &UploadId) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    debug!("Removing upload: {}", id);

    match state.gateway.remove_upload(id) {
        Ok(()) => {
            if let Err(e) = state.partition.snapshot() {
                error!("Snapshot after remove failed: {}", e);
                return error_response(&e);
            }
            simple_response(StatusCode::OK, json!({}).to_string())
        }
        Err(e) => {
            error!("Failed to remove upload {}: {}", id, e);
            error_response(&e)
        }
    }
}

/// Get upload handler
async fn handle_get(state: &AppState, id: &UploadId) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    match state.partition.get_upload(id) {
        Ok(info) => simple_response(StatusCode::OK, json!(info).to_string()),
        Err(e) => error_response(&e),
    }
}

/// List uploads handler
async fn handle_list(
    state: &AppState,
    query: Option<&str>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let filter = parse_list_query(query);
    debug!(
        "Listing uploads: prefix={:?}, id_marker={:?}, max={}",
        filter.prefix, filter.id_marker, filter.max
    );

    let uploads = state.partition.list_uploads(&filter);
    let response = ListUploadsResponse { uploads };
    simple_response(StatusCode::OK, json!(response).to_string())
}

fn bad_request(message: impl Into<String>) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    simple_response(
        StatusCode::BAD_REQUEST,
        json!({"error": message.into()}).to_string(),
    )
}

/// Map a core error to a protocol status: missing uploads are the expected
/// not-found outcome, everything else is a server fault
fn error_response(err: &MupdbError) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    simple_response(status, json!({"error": err.to_string()}).to_string())
}

/// Parsed upload route
#[derive(Debug, PartialEq, Eq)]
enum UploadPath {
    /// `/v1/uploads/{id}`
    Upload(UploadId),
    /// `/v1/uploads/{id}/parts`
    Parts(UploadId),
}

/// Parse a path like "/v1/uploads/{id}" or "/v1/uploads/{id}/parts"
fn parse_upload_path(path: &str) -> Option<UploadPath> {
    let rest = path.strip_prefix("/v1/uploads/")?;
    match rest.split_once('/') {
        None if !rest.is_empty() => Some(UploadPath::Upload(UploadId::from(rest))),
        Some((id, "parts")) if !id.is_empty() => Some(UploadPath::Parts(UploadId::from(id))),
        _ => None,
    }
}

/// Parse list query parameters into a filter
fn parse_list_query(query: Option<&str>) -> ListFilter {
    let mut filter = ListFilter {
        max: DEFAULT_LIST_MAX,
        ..Default::default()
    };
    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        match name {
            "prefix" => filter.prefix = decode_query_value(value),
            "key-marker" => filter.key_marker = decode_query_value(value),
            "id-marker" => filter.id_marker = decode_query_value(value),
            "max" => {
                if let Ok(max) = value.parse() {
                    filter.max = max;
                }
            }
            _ => {}
        }
    }
    filter
}

/// Percent-decode one query value; `+` decodes to a space. Malformed
/// escapes pass through literally.
fn decode_query_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let escape = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match escape {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_path() {
        // Valid paths
        assert_eq!(
            parse_upload_path("/v1/uploads/abc123"),
            Some(UploadPath::Upload(UploadId::from("abc123")))
        );
        assert_eq!(
            parse_upload_path("/v1/uploads/abc123/parts"),
            Some(UploadPath::Parts(UploadId::from("abc123")))
        );

        // Invalid paths
        assert_eq!(parse_upload_path("/v1/uploads/"), None);
        assert_eq!(parse_upload_path("/v1/uploads//parts"), None);
        assert_eq!(parse_upload_path("/v1/uploads/abc/unknown"), None);
        assert_eq!(parse_upload_path("/v2/uploads/abc"), None);
    }

    #[test]
    fn test_parse_list_query() {
        let filter = parse_list_query(Some("prefix=/p/&key-marker=/p/2&id-marker=abc&max=25"));
        assert_eq!(filter.prefix, "/p/");
        assert_eq!(filter.key_marker, "/p/2");
        assert_eq!(filter.id_marker, "abc");
        assert_eq!(filter.max, 25);
    }

    #[test]
    fn test_parse_list_query_defaults() {
        let filter = parse_list_query(None);
        assert!(filter.prefix.is_empty());
        assert!(filter.key_marker.is_empty());
        assert!(filter.id_marker.is_empty());
        assert_eq!(filter.max, DEFAULT_LIST_MAX);

        // Unknown params and malformed max are ignored
        let filter = parse_list_query(Some("unknown=1&max=oops"));
        assert_eq!(filter.max, DEFAULT_LIST_MAX);
    }

    #[test]
    fn test_parse_list_query_decodes_escaped_values() {
        let filter = parse_list_query(Some("prefix=%2Fp%2F&key-marker=%2Fp%2F2%20a"));
        assert_eq!(filter.prefix, "/p/");
        assert_eq!(filter.key_marker, "/p/2 a");
    }

    #[test]
    fn test_decode_query_value() {
        assert_eq!(decode_query_value("%2Fa%2Fb"), "/a/b");
        assert_eq!(decode_query_value("a+b"), "a b");
        assert_eq!(decode_query_value("plain"), "plain");

        // Malformed escapes pass through
        assert_eq!(decode_query_value("%zz"), "%zz");
        assert_eq!(decode_query_value("50%"), "50%");
        assert_eq!(decode_query_value("%2"), "%2");
    }
}
