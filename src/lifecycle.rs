use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Drained,
    /// The drain budget ran out and the listener task was aborted.
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("listener failed: {0}")]
    Serve(#[source] io::Error),

    #[error("listener task failed: {0}")]
    Task(#[from] JoinError),
}

pub struct Lifecycle {
    token: CancellationToken,
    drain_timeout: Duration,
}

impl Lifecycle {
    pub fn new(drain_timeout: Duration) -> Self {
        Lifecycle {
            token: CancellationToken::new(),
            drain_timeout,
        }
    }

    /// Cancelling this token has the same effect as the interrupt signal.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Binds `addr`, serves `app` until `signal` resolves, then drains.
    pub async fn run<F>(self, addr: String, app: Router, signal: F) -> Result<Shutdown, LifecycleError>
    where
        F: Future<Output = ()> + Send,
    {
        let listen = async move {
            let bound = TcpListener::bind(addr.as_str()).await;
            bound.map_err(|source| LifecycleError::Bind { addr, source })
        };
        self.drive(listen, app, signal).await
    }

    /// Like [`Lifecycle::run`], on a listener that is already bound.
    pub async fn run_with_listener<F>(
        self,
        listener: TcpListener,
        app: Router,
        signal: F,
    ) -> Result<Shutdown, LifecycleError>
    where
        F: Future<Output = ()> + Send,
    {
        self.drive(async move { Ok(listener) }, app, signal).await
    }

    async fn drive<L, F>(self, listen: L, app: Router, signal: F) -> Result<Shutdown, LifecycleError>
    where
        L: Future<Output = Result<TcpListener, LifecycleError>> + Send + 'static,
        F: Future<Output = ()> + Send,
    {
        let token = self.token;
        let listener_token = token.clone();

        let mut listener_task = tokio::spawn(async move {
            let result = serve(listen, app, listener_token.clone()).await;
            if let Err(e) = &result {
                error!("{}", e);
            }
            // Wakes the waiting side if the listener stopped on its own.
            listener_token.cancel();
            result
        });

        tokio::select! {
            _ = signal => info!("Interrupt received, shutting down"),
            _ = token.cancelled() => info!("Listener stopped, shutting down"),
        }
        token.cancel();

        match tokio::time::timeout(self.drain_timeout, &mut listener_task).await {
            Ok(joined) => {
                joined??;
                info!("All connections drained");
                Ok(Shutdown::Drained)
            }
            Err(_) => {
                warn!(
                    "Connections still open after {:?}, aborting",
                    self.drain_timeout
                );
                listener_task.abort();
                Ok(Shutdown::TimedOut)
            }
        }
    }
}

async fn serve<L>(listen: L, app: Router, token: CancellationToken) -> Result<(), LifecycleError>
where
    L: Future<Output = Result<TcpListener, LifecycleError>>,
{
    let listener = listen.await?;

    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .map_err(LifecycleError::Serve)
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install the Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
