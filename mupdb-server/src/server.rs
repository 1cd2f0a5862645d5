//! HTTP/2 server implementation

use hyper::server::conn::http2;
use hyper::service::service_fn;
use hyper::Response;
use hyper_util::rt::{TokioExecutor, TokioIo};
use http_body_util::Full;
use tokio::net::{TcpListener, TcpStream};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use mupdb_engine::{CommandGateway, LocalChannel, MetaPartition};
use crate::handlers::handle_request;

/// State shared by all request handlers: the partition's local index plus
/// the gateway that funnels every mutation through the replication channel.
pub struct AppState {
    pub partition: MetaPartition,
    pub gateway: CommandGateway<LocalChannel>,
}

pub struct UploadServer {
    state: Arc<AppState>,
}

impl UploadServer {
    pub fn new(partition: MetaPartition) -> Self {
        let gateway = partition.gateway();
        Self {
            state: Arc::new(AppState { partition, gateway }),
        }
    }

    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("mupdb server listening on {}", addr);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!("New connection from {}", remote_addr);

            let state = self.state.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(stream, state).await {
                    error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_connection(stream: TcpStream, state: Arc<AppState>) -> anyhow::Result<()> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let state = state.clone();
            async move { handle_request(req, state).await }
        });

        if let Err(err) = http2::Builder::new(TokioExecutor::new())
            .serve_connection(io, service)
            .await
        {
            error!("HTTP/2 connection error: {}", err);
        }

        Ok(())
    }
}

/// Simple HTTP response builder
pub fn simple_response(
    status: hyper::StatusCode,
    body: impl Into<String>,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("server", "mupdb/0.1.0")
        .body(Full::new(bytes::Bytes::from(body.into())))
        .unwrap())
}
