use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[async_trait]
pub trait Runnable: Send + Sync + 'static {
    fn run(self: Arc<Self>) -> (oneshot::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(self.run_impl(shutdown_rx));

        (shutdown_tx, handle)
    }

    async fn run_impl(self: Arc<Self>, shutdown_rx: oneshot::Receiver<()>);
}
