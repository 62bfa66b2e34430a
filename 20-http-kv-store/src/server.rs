use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tokio::{net::TcpListener, select, sync::mpsc, time};
use tracing::{info, warn};

use crate::{
    lifecycle::{DrainOutcome, Lifecycle},
    reporter::{DEFAULT_REPORT_INTERVAL, Report, Reporter},
    routes,
    store::Store,
};

/// Upper bound on how long in-flight requests may delay shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub report_interval: Duration,
    pub shutdown_timeout: Duration,
    pub public_dir: PathBuf,
    pub views_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            public_dir: PathBuf::from("public"),
            views_dir: PathBuf::from("views"),
        }
    }
}

/// State built once at startup and handed to the reporter and the router.
#[derive(Clone, Default)]
pub struct AppContext {
    pub store: Arc<Store>,
    pub lifecycle: Lifecycle,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    context: AppContext,
    report_sink: Option<mpsc::UnboundedSender<Report>>,
}

impl Server {
    pub fn new(listener: TcpListener, config: ServerConfig) -> Self {
        Self {
            listener,
            config,
            context: AppContext::new(),
            report_sink: None,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state of this server. Triggering its lifecycle starts shutdown.
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Forwards reporter output to `sink` as well as to the log.
    pub fn with_report_sink(mut self, sink: mpsc::UnboundedSender<Report>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// The application router bound to this server's store.
    pub fn router(&self) -> Router {
        routes::router(
            Arc::clone(&self.context.store),
            &self.config.public_dir,
            &self.config.views_dir,
        )
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<DrainOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let app = self.router();
        self.serve_router(app, shutdown).await
    }

    pub async fn run_until_ctrl_c(self) -> Result<DrainOutcome> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }

    /// Serves `app` until `shutdown` resolves or the lifecycle is triggered.
    ///
    /// Shutdown closes the stop signal, which ends the reporter and makes the
    /// server stop accepting connections. In-flight requests then get
    /// `shutdown_timeout` to finish before the server task is aborted.
    pub async fn serve_router<F>(self, app: Router, shutdown: F) -> Result<DrainOutcome>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            config,
            context,
            report_sink,
        } = self;
        let stop = context.lifecycle.stop_signal();

        let mut reporter = Reporter::new(Arc::clone(&context.store), config.report_interval);
        if let Some(sink) = report_sink {
            reporter = reporter.with_sink(sink);
        }
        let reporter_task = tokio::spawn(reporter.run(stop.clone()));

        let drain_signal = stop.clone();
        let mut server_task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { drain_signal.closed().await })
                .await
        });

        tokio::pin!(shutdown);
        select! {
            _ = &mut shutdown => {}
            _ = context.lifecycle.draining() => {}
            joined = &mut server_task => {
                context.lifecycle.trigger();
                let _ = reporter_task.await;
                joined.context("server task panicked")?.context("server failed")?;
                anyhow::bail!("server stopped before shutdown was requested");
            }
        }
        context.lifecycle.trigger();

        let outcome = match time::timeout(config.shutdown_timeout, &mut server_task).await {
            Ok(joined) => {
                joined.context("server task panicked")?.context("server failed")?;
                DrainOutcome::Drained
            }
            Err(_) => {
                warn!(
                    timeout_ms = config.shutdown_timeout.as_millis() as u64,
                    "drain timed out, abandoning open connections"
                );
                server_task.abort();
                DrainOutcome::Abandoned
            }
        };

        reporter_task.await.context("reporter task panicked")?;
        info!(?outcome, "server exited properly");
        Ok(outcome)
    }
}
