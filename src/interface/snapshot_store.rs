use crate::model::error::Error;
use crate::model::snapshot::ManagerSnapshot;
use async_trait::async_trait;

#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    async fn save(&self, snapshot: &ManagerSnapshot) -> Result<(), Error>;

    /// `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<ManagerSnapshot>, Error>;
}
