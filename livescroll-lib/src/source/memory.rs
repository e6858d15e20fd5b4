//! In-memory data source using DashMap for sort caching

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::DataSource;
use super::PageRequest;
use super::PageResponse;
use crate::error::SourceError;
use crate::model::Fields;
use crate::model::SortSpec;
use crate::model::Value;

/// A data source backed by a vector of rows held in memory.
///
/// Sorting is computed once per distinct [`SortSpec`] and cached as a
/// permutation of row positions, so paging through a sorted view costs one
/// slice per request.
///
/// # Example
///
/// ```
/// use livescroll_lib::source::InMemorySource;
///
/// let source = InMemorySource::new(Vec::new());
/// assert!(source.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: Arc<Vec<Fields>>,
    orders: DashMap<SortSpec, Arc<Vec<usize>>>,
    latency: Option<Duration>,
}

impl InMemorySource {
    /// Creates a new source over the given rows.
    pub fn new(rows: Vec<Fields>) -> Self {
        Self {
            rows: Arc::new(rows),
            orders: DashMap::new(),
            latency: None,
        }
    }

    /// Delays every response, simulating a remote store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of rows in the dataset.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of cached sort permutations.
    pub fn cached_orders(&self) -> usize {
        self.orders.len()
    }

    fn order_for(&self, sort: &SortSpec) -> Arc<Vec<usize>> {
        if let Some(order) = self.orders.get(sort) {
            return Arc::clone(order.value());
        }

        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        if let Some(field) = sort.field() {
            // Stable sort keeps source order among equal keys.
            order.sort_by(|&a, &b| {
                let left = self.rows[a].get(field).unwrap_or(&Value::Null);
                let right = self.rows[b].get(field).unwrap_or(&Value::Null);
                left.sort_cmp(right)
            });
            if sort.is_descending() {
                order.reverse();
            }
        }

        let order = Arc::new(order);
        self.orders.insert(sort.clone(), Arc::clone(&order));
        order
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SourceError> {
        if request.page_size == 0 {
            return Err(SourceError::invalid_page(
                request.page_index,
                "page size must be positive",
            ));
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let order = self.order_for(&request.sort);
        let total = order.len();
        let start = request.offset().min(total);
        let end = start.saturating_add(request.page_size).min(total);

        let rows = order[start..end]
            .iter()
            .map(|&i| self.rows[i].clone())
            .collect();

        Ok(PageResponse::new(rows, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnDef;

    fn dataset(n: usize) -> Vec<Fields> {
        (0..n)
            .map(|i| {
                let mut f = Fields::new();
                f.insert("id".into(), Value::from(format!("r{i}")));
                f.insert("rank".into(), Value::from((i % 7) as i64));
                f
            })
            .collect()
    }

    fn request(page_index: usize, sort: SortSpec) -> PageRequest {
        PageRequest {
            page_index,
            page_size: 10,
            columns: vec![ColumnDef::new("id")],
            id_field: "id".into(),
            sort,
        }
    }

    #[tokio::test]
    async fn test_fetch_page_slices_dataset() {
        let source = InMemorySource::new(dataset(25));

        let page = source.fetch_page(&request(2, SortSpec::none())).await.unwrap();
        assert_eq!(page.total_count(), 25);
        assert_eq!(page.len(), 5);
        assert_eq!(page.rows()[0].get("id"), Some(&Value::from("r20")));

        let past_end = source.fetch_page(&request(9, SortSpec::none())).await.unwrap();
        assert!(past_end.is_empty());
        assert_eq!(past_end.total_count(), 25);
    }

    #[tokio::test]
    async fn test_fetch_page_sorted_descending() {
        let source = InMemorySource::new(dataset(25));

        let page = source
            .fetch_page(&request(0, SortSpec::desc("rank")))
            .await
            .unwrap();
        let ranks: Vec<_> = page.rows().iter().map(|r| r["rank"].clone()).collect();
        assert_eq!(ranks[0], Value::from(6i64));
        assert_eq!(ranks[2], Value::from(6i64));
        assert_eq!(ranks[3], Value::from(5i64));
        assert!(ranks.windows(2).all(|w| w[0].sort_cmp(&w[1]).is_ge()));
        assert_eq!(source.cached_orders(), 1);

        // Same spec reuses the cached permutation.
        source
            .fetch_page(&request(1, SortSpec::desc("rank")))
            .await
            .unwrap();
        assert_eq!(source.cached_orders(), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let source = InMemorySource::new(dataset(3));
        let mut req = request(0, SortSpec::none());
        req.page_size = 0;
        let err = source.fetch_page(&req).await.unwrap_err();
        assert_eq!(err.page_index(), Some(0));
    }
}
