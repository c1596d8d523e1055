//! Cached quest and training queries.

use std::sync::Arc;

use tsutome_client::ClientError;
use tsutome_protocol::{Shuren, Tsutome};
use tsutome_transport::Transport;

use crate::{AuthContext, QueryKey};

/// Page-level data queries, served through the context's cache.
///
/// A 401 from either endpoint means the session ended server-side; the
/// context is told to re-probe so the route guard can react.
pub struct QuestQueries<T: Transport> {
    context: AuthContext<T>,
}

impl<T: Transport> QuestQueries<T> {
    pub fn new(context: AuthContext<T>) -> Self {
        Self { context }
    }

    pub async fn tsutomes(&self) -> Result<Arc<Vec<Tsutome>>, ClientError> {
        let api = self.context.api().clone();
        let result = self
            .context
            .cache()
            .fetch(QueryKey::Tsutomes, || async move { api.tsutomes().await })
            .await;
        self.check(result)
    }

    pub async fn shurens(&self) -> Result<Arc<Vec<Shuren>>, ClientError> {
        let api = self.context.api().clone();
        let result = self
            .context
            .cache()
            .fetch(QueryKey::Shurens, || async move { api.shurens().await })
            .await;
        self.check(result)
    }

    fn check<V>(&self, result: Result<V, ClientError>) -> Result<V, ClientError> {
        if let Err(ClientError::Unauthenticated) = &result {
            tracing::info!("query answered 401; re-probing session");
            self.context.invalidate();
        }
        result
    }
}
