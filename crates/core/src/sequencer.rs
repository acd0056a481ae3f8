use futures_util::future::try_join;

use crate::data_source::{DataSource, DataSourceError};
use crate::document::Document;
use crate::query::{QuerySpec, SortSpec};

/// Identifies one issued load. Tokens are minted in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> RequestToken {
        self.latest = self.latest.saturating_add(1);
        RequestToken(self.latest)
    }

    /// Only the most recently minted token is current; older ones are stale.
    #[must_use]
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest > 0 && token.0 == self.latest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub token: RequestToken,
    pub query: QuerySpec,
    pub sort: SortSpec,
    pub page_index: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub documents: Vec<Document>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadResponse {
    pub token: RequestToken,
    pub result: Result<PageSnapshot, DataSourceError>,
}

/// Runs the count and the page fetch for `request` concurrently.
pub async fn fetch_page<S>(source: &S, request: &LoadRequest) -> LoadResponse
where
    S: DataSource + ?Sized,
{
    let result = try_join(
        source.count(&request.query),
        source.find(&request.query, &request.sort, request.skip, request.limit),
    )
    .await
    .map(|(total_count, documents)| PageSnapshot {
        documents,
        total_count,
    });

    LoadResponse {
        token: request.token,
        result,
    }
}
