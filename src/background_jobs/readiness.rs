use std::future::Future;
use tokio::sync::watch;
use tracing::debug;

/// Process-wide "app is ready" flag. Once set it stays set.
#[derive(Clone)]
pub struct AppReadiness {
    sender: watch::Sender<bool>,
}

impl AppReadiness {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// A readiness flag that is already set.
    pub fn ready() -> Self {
        let readiness = Self::new();
        readiness.set_app_is_ready();
        readiness
    }

    pub fn is_app_ready(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn set_app_is_ready(&self) {
        let changed = self.sender.send_if_modified(|ready| {
            let was_ready = *ready;
            *ready = true;
            !was_ready
        });
        if changed {
            debug!("App marked ready");
        }
    }

    pub async fn wait_until_ready(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            // The sender lives in self, so this only fails if it is dropped
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }

    /// Runs `f` once, after the app becomes ready. Spawns a task, so it must be
    /// called from within a tokio runtime.
    pub fn run_when_ready<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let readiness = self.clone();
        tokio::spawn(async move {
            readiness.wait_until_ready().await;
            f().await;
        });
    }
}

impl Default for AppReadiness {
    fn default() -> Self {
        Self::new()
    }
}
