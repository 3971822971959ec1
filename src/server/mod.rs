//! HTTP API.
//!
//! [`router`] assembles the complete application: auth, queue, image upload
//! and proxy, live event stream and the admin panel. Handlers are generic
//! over the store and the file store so tests can run the real router on
//! in-memory backends.

pub mod error;
mod routes;
pub mod session;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::Result;
use crate::fanout::Broadcaster;
use crate::filestore::FileStore;
use crate::queue::{ClaimPolicy, Queue};
use crate::store::Store;
use crate::system::{System, SystemContext};

pub use error::ApiError;
pub use session::{AdminUser, CurrentUser};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared application state.
pub struct AppState<S, F> {
    pub queue: Queue<S, Broadcaster>,
    pub system: System<S, Broadcaster>,
    pub context: Arc<SystemContext>,
    pub files: F,
    pub events: Broadcaster,
}

impl<S: Store, F: FileStore> AppState<S, F> {
    pub fn new(
        store: Arc<S>,
        files: F,
        context: Arc<SystemContext>,
        events: Broadcaster,
        policy: ClaimPolicy,
    ) -> Self {
        Self {
            queue: Queue::new(Arc::clone(&store), events.clone(), policy),
            system: System::new(store, events.clone()),
            context,
            files,
            events,
        }
    }
}

/// Build the complete router.
pub fn router<S: Store, F: FileStore>(state: Arc<AppState<S, F>>) -> Router {
    routes::router::<S, F>()
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<S: Store, F: FileStore>(
    listener: TcpListener,
    state: Arc<AppState<S, F>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "hubqueue listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("hubqueue stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
