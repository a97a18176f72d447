use super::job::JobError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type Operation = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A FIFO lane that runs queued operations one at a time on a single worker
/// task. An operation is not started until the previous one has finished.
#[derive(Clone)]
pub struct SerialTaskQueue {
    name: &'static str,
    sender: mpsc::UnboundedSender<Operation>,
    shutdown_token: CancellationToken,
}

impl SerialTaskQueue {
    /// Spawns the worker. Must be called from within a tokio runtime.
    pub fn new(name: &'static str) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shutdown_token = CancellationToken::new();
        tokio::spawn(Self::run(name, receiver, shutdown_token.clone()));
        Self {
            name,
            sender,
            shutdown_token,
        }
    }

    async fn run(
        name: &'static str,
        mut receiver: mpsc::UnboundedReceiver<Operation>,
        shutdown_token: CancellationToken,
    ) {
        debug!("Serial queue {} started", name);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_token.cancelled() => {
                    info!("Serial queue {} received shutdown signal", name);
                    break;
                }
                next = receiver.recv() => match next {
                    Some(operation) => operation().await,
                    None => break,
                },
            }
        }
        debug!("Serial queue {} stopped", name);
    }

    /// Queues `f` behind everything already enqueued. The receiver resolves
    /// with the operation's output, or errors if the lane stopped first.
    pub fn enqueue<F, Fut, T>(&self, f: F) -> oneshot::Receiver<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_sender, result_receiver) = oneshot::channel();
        let operation: Operation = Box::new(move || {
            async move {
                let _ = result_sender.send(f().await);
            }
            .boxed()
        });
        if self.sender.send(operation).is_err() {
            debug!("Serial queue {} is closed, dropping operation", self.name);
        }
        result_receiver
    }

    /// Resolves once every operation enqueued before this call has run.
    pub async fn flush(&self) -> Result<(), JobError> {
        self.enqueue(|| async {})
            .await
            .map_err(|_| JobError::QueueClosed)
    }

    /// Stops the worker once the running operation, if any, finishes.
    /// Operations still queued are dropped.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
