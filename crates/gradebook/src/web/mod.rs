//! HTTP surface.
//!
//! The router wires the login, logout, student and grade pages to their
//! handlers. Shared state is a single [`RecordService`] behind a mutex and the
//! [`AccessGuard`] holding every client's session. Record operations block on
//! `SQLite`, so they run on the blocking thread pool via
//! [`AppState::with_records`].

pub mod handlers;
pub mod pages;
pub mod session;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::AccessGuard;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::records::RecordService;
use crate::storage::Storage;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The record operations over the open database.
    pub records: Arc<Mutex<RecordService>>,
    /// Login checks and sessions.
    pub guard: AccessGuard,
    /// Name of the session cookie.
    pub cookie_name: Arc<str>,
}

impl AppState {
    /// Bundle the pieces into shareable state.
    #[must_use]
    pub fn new(records: RecordService, guard: AccessGuard, cookie_name: &str) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            guard,
            cookie_name: Arc::from(cookie_name),
        }
    }

    /// Run `op` against the record service on the blocking thread pool.
    ///
    /// Calls are serialized by the mutex, so a check-then-insert inside `op`
    /// cannot interleave with another request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the task panicked or was cancelled.
    pub async fn with_records<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&RecordService) -> T + Send + 'static,
        T: Send + 'static,
    {
        let records = Arc::clone(&self.records);
        tokio::task::spawn_blocking(move || {
            let records = records.lock().unwrap_or_else(PoisonError::into_inner);
            op(&records)
        })
        .await
        .map_err(|err| Error::internal(format!("record task failed: {err}")))
    }

    /// Open the configured database and build state from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Ok(Self::new(
            RecordService::new(storage),
            AccessGuard::new(config.credentials()),
            &config.server.session_cookie,
        ))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::login_page).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .route(
            "/students",
            get(handlers::students_page).post(handlers::register_student),
        )
        .route(
            "/grades",
            get(handlers::grades_page).post(handlers::record_grade),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the application on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server stops because of an I/O failure.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::result::Result<(), std::io::Error> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Open the database, bind the configured address, and serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let address = config.bind_address()?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|err| Error::server(format!("failed to bind {address}: {err}")))?;
    info!("Server running on http://{}", address);

    serve(listener, state, shutdown_signal())
        .await
        .map_err(|err| Error::server(err.to_string()))?;

    info!("Server shut down");
    Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("Failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
