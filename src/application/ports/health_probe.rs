use async_trait::async_trait;

/// Reports whether the record store is reachable.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn store_reachable(&self) -> bool;
}
