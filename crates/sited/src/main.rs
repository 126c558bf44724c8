//! sited - toy HTTP static-file server with a bounded LRU resource cache

mod handler;
mod http;
mod mime;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use bytes::BytesMut;
use clap::Parser;
use sitecache::SiteCache;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::handler::RequestHandler;
use crate::http::{Request, Response, Status, MAX_REQUEST_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:3490")]
    bind: String,

    /// Web root served to clients
    #[arg(short, long, default_value = "./serverroot")]
    root: PathBuf,

    /// Directory holding server pages such as 404.html
    #[arg(short = 'f', long, default_value = "./serverfiles")]
    server_files: PathBuf,

    /// Cache capacity (number of resources)
    #[arg(short, long, default_value_t = 10)]
    capacity: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting sited v{}", env!("CARGO_PKG_VERSION"));
    info!("Web root: {}", args.root.display());
    info!("Server files: {}", args.server_files.display());
    info!("Cache capacity: {} resources", args.capacity);

    let cache = Arc::new(SiteCache::new(args.capacity)?);
    let handler = Arc::new(RequestHandler::new(args.root, args.server_files, cache));

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Server listening on http://{}", args.bind);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = Arc::clone(&handler);

                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, handler).await {
                        error!("Error handling client {}: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Serve exactly one request, then close the connection.
async fn handle_client(mut stream: TcpStream, handler: Arc<RequestHandler>) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(4096);

    let response = loop {
        let n = stream.read_buf(&mut buffer).await?;

        if n == 0 {
            // Client went away before sending a full request line
            return Ok(());
        }

        match Request::parse(&buffer) {
            Ok(Some(request)) => break handler.handle(&request),
            Ok(None) if buffer.len() > MAX_REQUEST_SIZE => {
                warn!("Request exceeded {} bytes without a request line", MAX_REQUEST_SIZE);
                break Response::new(
                    Status::BadRequest,
                    "text/plain",
                    b"request too large\n".to_vec(),
                );
            }
            Ok(None) => {
                // Need more data
                continue;
            }
            Err(e) => {
                warn!("Bad request: {}", e);
                break Response::new(Status::BadRequest, "text/plain", b"bad request\n".to_vec());
            }
        }
    };

    stream.write_all(&response.serialize()).await?;
    stream.shutdown().await?;
    Ok(())
}
