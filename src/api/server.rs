//! Serving the router on a Unix domain socket

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use std::future::Future;
use std::io;
use tokio::net::UnixListener;
use tracing::{debug, warn};

/// Accept HTTP/1 connections on `listener` until `shutdown` completes.
///
/// Connections already accepted keep running until their client is done.
pub async fn serve_unix<F>(listener: UnixListener, app: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);

    loop {
        let stream = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!(error = %e, "Failed to accept Unix socket connection");
                    continue;
                }
            },
        };

        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(error = %e, "Unix socket connection closed with error");
            }
        });
    }

    Ok(())
}
