use crate::ProbeResult;
use async_trait::async_trait;

/// One cheap read against the backend, used only to assess reachability.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> ProbeResult<()>;
}
