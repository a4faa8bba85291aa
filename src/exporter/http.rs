//! Scrape endpoint
//!
//! A blocking `tiny_http` server that renders the registry in the Prometheus
//! text format on one path and answers 404 everywhere else.

use crate::error::{ExporterError, Result};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use tiny_http::{Header, Request, Response, Server};

/// HTTP server exposing a registry
pub struct MetricsServer {
    server: Server,
    registry: Registry,
    metrics_path: String,
}

impl MetricsServer {
    /// Bind to `address` and serve `registry` on `metrics_path`
    pub fn bind(address: &str, registry: Registry, metrics_path: impl Into<String>) -> Result<Self> {
        let server = Server::http(address)
            .map_err(|e| ExporterError::Http(format!("failed to bind {}: {}", address, e)))?;

        Ok(Self {
            server,
            registry,
            metrics_path: metrics_path.into(),
        })
    }

    /// Address actually bound, useful when binding to port 0
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the listener fails
    pub fn run(&self) {
        tracing::info!(addr = ?self.local_addr(), path = %self.metrics_path, "serving metrics");
        for request in self.server.incoming_requests() {
            self.handle(request);
        }
    }

    fn handle(&self, request: Request) {
        let path = request.url().split('?').next().unwrap_or_default();

        let response = if path == self.metrics_path {
            match self.render() {
                Ok((body, content_type)) => {
                    let mut response = Response::from_data(body);
                    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
                        Ok(header) => response.add_header(header),
                        Err(()) => tracing::warn!(%content_type, "invalid content type header"),
                    }
                    response
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode metrics");
                    Response::from_string(e.to_string()).with_status_code(500)
                }
            }
        } else {
            Response::from_string("not found").with_status_code(404)
        };

        if let Err(e) = request.respond(response) {
            tracing::debug!(error = %e, "failed to send response");
        }
    }

    /// Encode the registry in the text exposition format
    pub fn render(&self) -> Result<(Vec<u8>, String)> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok((buf, encoder.format_type().to_string()))
    }
}
