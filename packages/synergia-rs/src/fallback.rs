//! Priority-ordered source chain for resources with more than one origin.

use async_trait::async_trait;

/// One way of obtaining a resource — a REST endpoint, a scraped page, or
/// anything else that can produce the normalized shape. Strategies report
/// a miss as `None`; they never abort the chain.
#[async_trait]
pub trait FetchStrategy<T>: Send + Sync {
    async fn try_fetch(&self) -> Option<T>;
}

/// Try strategies in priority order, returning the first hit.
pub async fn first_hit<T>(strategies: &[&dyn FetchStrategy<T>]) -> Option<T> {
    for strategy in strategies {
        if let Some(value) = strategy.try_fetch().await {
            return Some(value);
        }
    }
    None
}
