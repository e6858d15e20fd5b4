//! Paging coordinator.
//!
//! Bridges window changes to data source fetches and page evictions.
//!
//! # State machine
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──first page applied──▶ Ready
//!                                      ▲                                 │
//!                                      └────────── initialize() ─────────┘
//! ```
//!
//! # Fetch bookkeeping
//!
//! Every initialize, refresh and sort change starts a new epoch. A fetch
//! carries the epoch it was issued in; its result is applied only if the
//! epoch is still current and its page is still resident when it arrives.
//! Anything else is a stale completion and is dropped. There is no
//! cancellation: evicting a page just makes its pending result stale.
//! Dropping the future of a call releases its pending pages, which the next
//! call then fetches again.
//!
//! At most one fetch per page index is in flight within an epoch. A page
//! that leaves and re-enters the window while its fetch is pending waits for
//! that fetch rather than issuing a second one.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::oneshot;
use tokio::sync::watch;

use crate::error::Error;
use crate::events::GridEvents;
use crate::model::ColumnDef;
use crate::model::Page;
use crate::model::Row;
use crate::model::SortSpec;
use crate::rate_limit::ConcurrencyLimiter;
use crate::source::DataSource;
use crate::source::PageRequest;
use crate::source::PageResponse;
use crate::store::PageDataStore;
use crate::store::RowChanges;

/// Externally visible coordinator state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// `initialize` has never been called.
    #[default]
    Uninitialized,
    /// Waiting for the first page of the current initialization.
    Initializing,
    /// At least one page of the current initialization has loaded.
    Ready,
}

/// One-shot notification that the first page of an initialization landed.
///
/// Delivered at most once. A later `initialize` supersedes it.
#[derive(Debug)]
pub struct InitialLoad {
    rx: oneshot::Receiver<()>,
}

impl InitialLoad {
    /// Waits for the initial load.
    ///
    /// Returns `false` if the initialization was superseded (or the
    /// coordinator dropped) before its first page arrived.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}

/// A page fetch that failed. The page stays resident but unloaded, and any
/// rows it held are destroyed.
#[derive(Debug)]
pub struct PageFailure {
    /// The page that could not be fetched.
    pub index: usize,
    /// What went wrong.
    pub error: Error,
}

/// What a `change_pages` or `refresh` call did.
#[derive(Debug, Default)]
pub struct WindowChange {
    /// Pages removed from the window.
    pub evicted: Vec<usize>,
    /// Pages this call fetched.
    pub requested: Vec<usize>,
    /// Fetched pages whose rows were applied, in completion order.
    pub loaded: Vec<usize>,
    /// Fetched pages whose results arrived stale and were dropped.
    pub discarded: Vec<usize>,
    /// Fetched pages whose fetch failed.
    pub failed: Vec<PageFailure>,
}

impl WindowChange {
    /// Returns `true` if no fetch failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Query {
    page_size: usize,
    columns: Vec<ColumnDef>,
    id_field: String,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    lifecycle: Lifecycle,
    query: Option<Query>,
    sort: SortSpec,
    selected: HashSet<String>,
    store: PageDataStore,
    /// Page index -> epoch of the fetch currently pending for it.
    in_flight: HashMap<usize, u64>,
    epoch: u64,
    total_count: usize,
    initial_done: Option<oneshot::Sender<()>>,
}

/// Fetches planned for one call, captured under the lock.
struct Dispatch {
    requests: Vec<PageRequest>,
    epoch: u64,
    id_field: String,
}

struct Inner {
    source: Arc<dyn DataSource>,
    limiter: ConcurrencyLimiter,
    events: GridEvents,
    state: Mutex<CoordinatorState>,
    pages_tx: watch::Sender<Vec<Page>>,
}

/// Drives page fetches and evictions for the resident window.
///
/// Cheap to clone: clones share the same state.
#[derive(Clone)]
pub struct PagingCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PagingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PagingCoordinator")
            .field("lifecycle", &state.lifecycle)
            .field("window", &state.store.indices())
            .field("epoch", &state.epoch)
            .field("total_count", &state.total_count)
            .finish()
    }
}

impl PagingCoordinator {
    /// Creates a coordinator fetching from `source`.
    pub fn new(source: Arc<dyn DataSource>, limiter: ConcurrencyLimiter) -> Self {
        let (pages_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                source,
                limiter,
                events: GridEvents::new(),
                state: Mutex::new(CoordinatorState::default()),
                pages_tx,
            }),
        }
    }

    /// The channels row lifecycle events are emitted on.
    pub fn events(&self) -> &GridEvents {
        &self.inner.events
    }

    fn state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resets the coordinator for a new schema or page size.
    ///
    /// Every resident page is evicted, the window becomes `{0}`, pending
    /// fetches become stale and the propagated selection is cleared. Returns
    /// the one-shot for this initialization's first page.
    pub fn initialize(
        &self,
        page_size: usize,
        columns: Vec<ColumnDef>,
        id_field: impl Into<String>,
    ) -> InitialLoad {
        let (tx, rx) = oneshot::channel();
        let id_field = id_field.into();

        let (destroyed, snapshot) = {
            let mut state = self.state();
            let destroyed = state.store.clear();
            state.store.reserve(0);
            state.epoch += 1;
            state.in_flight.clear();
            state.total_count = 0;
            state.selected.clear();
            state.query = Some(Query {
                page_size,
                columns,
                id_field,
            });
            state.lifecycle = Lifecycle::Initializing;
            // Replacing the sender drops any previous one, so an older
            // waiter resolves as superseded instead of firing later.
            state.initial_done = Some(tx);
            log::info!(
                "paging initialized: page_size={page_size}, epoch={}",
                state.epoch
            );
            (destroyed, state.store.snapshot())
        };

        self.deliver(RowChanges {
            destroyed,
            created: Vec::new(),
        });
        self.publish(snapshot);
        InitialLoad { rx }
    }

    /// Re-fetches every page of the window with the current sort and
    /// selection.
    pub async fn refresh(&self) -> Result<WindowChange, Error> {
        let dispatch = {
            let mut state = self.state();
            let query = state.query.clone().ok_or(Error::NotInitialized)?;
            state.epoch += 1;
            let epoch = state.epoch;
            let targets: Vec<usize> = state.store.indices().into_iter().collect();
            for &index in &targets {
                state.in_flight.insert(index, epoch);
            }
            log::debug!("refresh: pages={targets:?}, epoch={epoch}");
            build_dispatch(&query, &state.sort, targets, epoch)
        };

        let mut report = WindowChange {
            requested: dispatch.requests.iter().map(|r| r.page_index).collect(),
            ..WindowChange::default()
        };
        self.fetch_all(dispatch, &mut report).await;
        Ok(report)
    }

    /// Moves the resident window to exactly `pages_to_load`.
    ///
    /// Pages outside the set are evicted immediately (their rows receive
    /// destroy events). Pages inside the set that are neither loaded nor
    /// already being fetched are fetched with the given sort, and their rows
    /// are marked selected from `selected_ids`. A sort different from the
    /// current one re-fetches the whole set.
    ///
    /// An empty set means "no usable scroll signal" and leaves the window
    /// untouched.
    pub async fn change_pages(
        &self,
        pages_to_load: &BTreeSet<usize>,
        sort_field: Option<&str>,
        sort_descending: bool,
        selected_ids: &[String],
    ) -> Result<WindowChange, Error> {
        let sort = SortSpec::from_parts(sort_field, sort_descending);
        let (dispatch, evicted, destroyed, snapshot) = {
            let mut guard = self.state();
            let state = &mut *guard;
            let query = state.query.clone().ok_or(Error::NotInitialized)?;

            if pages_to_load.is_empty() {
                log::debug!("change_pages: empty plan, window unchanged");
                return Ok(WindowChange::default());
            }

            state.selected = selected_ids.iter().cloned().collect();
            state.store.sync_selection(&state.selected);

            let resort = sort != state.sort;
            if resort {
                state.sort = sort.clone();
                state.epoch += 1;
                log::debug!("change_pages: sort changed to {sort:?}, epoch={}", state.epoch);
            }
            let epoch = state.epoch;

            let mut evicted = Vec::new();
            let mut destroyed = Vec::new();
            for index in state.store.indices() {
                if pages_to_load.contains(&index) {
                    continue;
                }
                if let Some(rows) = state.store.evict(index) {
                    evicted.push(index);
                    destroyed.extend(rows);
                }
            }

            let mut targets = Vec::new();
            for &index in pages_to_load {
                state.store.reserve(index);
                let pending = state.in_flight.get(&index) == Some(&epoch);
                if resort || (!state.store.is_loaded(index) && !pending) {
                    state.in_flight.insert(index, epoch);
                    targets.push(index);
                }
            }

            log::debug!(
                "change_pages: window={pages_to_load:?}, evicted={evicted:?}, fetching={targets:?}"
            );
            (
                build_dispatch(&query, &state.sort, targets, epoch),
                evicted,
                destroyed,
                state.store.snapshot(),
            )
        };

        self.deliver(RowChanges {
            destroyed,
            created: Vec::new(),
        });
        self.publish(snapshot);

        let mut report = WindowChange {
            evicted,
            requested: dispatch.requests.iter().map(|r| r.page_index).collect(),
            ..WindowChange::default()
        };
        self.fetch_all(dispatch, &mut report).await;
        Ok(report)
    }

    /// Replaces the selection used to mark rows and recomputes the flag of
    /// every resident row.
    pub fn set_selected_ids(&self, ids: &[String]) {
        let snapshot = {
            let mut guard = self.state();
            let state = &mut *guard;
            state.selected = ids.iter().cloned().collect();
            state.store.sync_selection(&state.selected);
            state.store.snapshot()
        };
        self.publish(snapshot);
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    async fn fetch_all(&self, dispatch: Dispatch, report: &mut WindowChange) {
        let Dispatch {
            requests,
            epoch,
            id_field,
        } = dispatch;

        let mut unfinished = Unfinished {
            coordinator: self,
            epoch,
            pages: requests.iter().map(|r| r.page_index).collect(),
        };

        let mut fetches: FuturesUnordered<_> = requests
            .into_iter()
            .map(|request| async move {
                let result = self.fetch_one(&request).await;
                (request.page_index, result)
            })
            .collect();

        while let Some((index, result)) = fetches.next().await {
            unfinished.pages.remove(&index);
            self.complete(index, epoch, &id_field, result, report);
        }
    }

    async fn fetch_one(&self, request: &PageRequest) -> Result<PageResponse, Error> {
        let _permit = self.inner.limiter.acquire().await?;
        let response = self.inner.source.fetch_page(request).await?;
        Ok(response)
    }

    fn complete(
        &self,
        index: usize,
        epoch: u64,
        id_field: &str,
        result: Result<PageResponse, Error>,
        report: &mut WindowChange,
    ) {
        let (changes, snapshot, initial_done) = {
            let mut guard = self.state();
            let state = &mut *guard;

            if state.in_flight.get(&index) == Some(&epoch) {
                state.in_flight.remove(&index);
            }

            if epoch != state.epoch || !state.store.contains(index) {
                log::debug!("discarding stale result for page {index} (epoch {epoch})");
                report.discarded.push(index);
                return;
            }

            match result {
                Ok(response) => {
                    state.total_count = response.total_count();
                    let rows: Vec<Row> = response
                        .into_rows()
                        .into_iter()
                        .filter_map(|fields| {
                            let row = Row::from_fields(id_field, fields);
                            if row.is_none() {
                                log::warn!("page {index}: skipping row without usable '{id_field}'");
                            }
                            row
                        })
                        .collect();

                    let changes = state.store.apply(index, rows, &state.selected);
                    report.loaded.push(index);

                    let initial_done = if state.lifecycle == Lifecycle::Initializing {
                        state.lifecycle = Lifecycle::Ready;
                        state.initial_done.take()
                    } else {
                        None
                    };
                    (changes, state.store.snapshot(), initial_done)
                }
                Err(error) => {
                    log::warn!("fetch of page {index} failed: {error}");
                    report.failed.push(PageFailure { index, error });
                    // Back to a placeholder so the next call fetches it again.
                    let changes = RowChanges {
                        destroyed: state.store.mark_failed(index),
                        created: Vec::new(),
                    };
                    (changes, state.store.snapshot(), None)
                }
            }
        };

        self.deliver(changes);
        self.publish(snapshot);
        if let Some(tx) = initial_done {
            log::info!("initial load complete");
            let _ = tx.send(());
        }
    }

    fn deliver(&self, changes: RowChanges) {
        for evt in &changes.destroyed {
            self.inner.events.row_destroy.emit(evt);
        }
        for evt in &changes.created {
            self.inner.events.row_create.emit(evt);
        }
    }

    fn publish(&self, snapshot: Vec<Page>) {
        self.inner.pages_tx.send_replace(snapshot);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state().lifecycle
    }

    /// Total row count of the dataset as last reported by the source.
    pub fn total_count(&self) -> usize {
        self.state().total_count
    }

    /// Number of pages in the dataset, once the page size and a total are
    /// known.
    pub fn page_count(&self) -> Option<usize> {
        let state = self.state();
        let page_size = state.query.as_ref()?.page_size;
        if page_size == 0 || state.total_count == 0 {
            return None;
        }
        Some(state.total_count.div_ceil(page_size))
    }

    /// Indices of the resident window, loaded or pending.
    pub fn resident_window(&self) -> BTreeSet<usize> {
        self.state().store.indices()
    }

    /// Returns `true` if at least one resident page has loaded.
    pub fn has_loaded_pages(&self) -> bool {
        self.state().store.loaded_count() > 0
    }

    /// Snapshot of every resident page in ascending index order.
    pub fn pages(&self) -> Vec<Page> {
        self.state().store.snapshot()
    }

    /// Stream of resident page snapshots, updated on every change.
    pub fn page_services(&self) -> watch::Receiver<Vec<Page>> {
        self.inner.pages_tx.subscribe()
    }

    /// Rows of the page at `index`.
    pub fn rows_state(&self, index: usize) -> Option<Vec<Row>> {
        self.state().store.rows_state(index).map(<[Row]>::to_vec)
    }

    /// All resident rows, de-duplicated, in page then row order.
    pub fn flatten(&self) -> Vec<Row> {
        self.state().store.flatten()
    }

    /// Finds a resident row by id, with the index of its page.
    pub fn find_row(&self, id: &str) -> Option<(usize, Row)> {
        self.state()
            .store
            .find(id)
            .map(|(page, row)| (page, row.clone()))
    }

    /// The sort pages are currently fetched with.
    pub fn sort(&self) -> SortSpec {
        self.state().sort.clone()
    }

    /// The selection propagated to fetches, sorted.
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of fetches currently pending.
    pub fn in_flight(&self) -> usize {
        self.state().in_flight.len()
    }
}

/// Fetches of one `fetch_all` call that have not completed yet.
///
/// If the caller drops the future mid-fetch, the pending marks of this
/// epoch are cleared so the pages can be requested again.
struct Unfinished<'a> {
    coordinator: &'a PagingCoordinator,
    epoch: u64,
    pages: BTreeSet<usize>,
}

impl Drop for Unfinished<'_> {
    fn drop(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        let mut state = self.coordinator.state();
        for index in &self.pages {
            if state.in_flight.get(index) == Some(&self.epoch) {
                state.in_flight.remove(index);
            }
        }
        log::debug!(
            "fetch abandoned: pages={:?}, epoch={}",
            self.pages,
            self.epoch
        );
    }
}

fn build_dispatch(query: &Query, sort: &SortSpec, targets: Vec<usize>, epoch: u64) -> Dispatch {
    let requests = targets
        .into_iter()
        .map(|page_index| PageRequest {
            page_index,
            page_size: query.page_size,
            columns: query.columns.clone(),
            id_field: query.id_field.clone(),
            sort: sort.clone(),
        })
        .collect();
    Dispatch {
        requests,
        epoch,
        id_field: query.id_field.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;
    use crate::model::Value;
    use crate::source::InMemorySource;

    fn source(n: usize) -> Arc<dyn DataSource> {
        let rows = (0..n)
            .map(|i| {
                let mut f = Fields::new();
                f.insert("id".into(), Value::from(format!("r{i}")));
                f
            })
            .collect();
        Arc::new(InMemorySource::new(rows))
    }

    fn window(v: &[usize]) -> BTreeSet<usize> {
        v.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_change_pages_before_initialize() {
        let coordinator = PagingCoordinator::new(source(10), ConcurrencyLimiter::default());
        let err = coordinator
            .change_pages(&window(&[0]), None, false, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        assert!(matches!(
            coordinator.refresh().await,
            Err(Error::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_initialize_resets_window_to_first_page() {
        let coordinator = PagingCoordinator::new(source(10), ConcurrencyLimiter::default());
        let _initial = coordinator.initialize(5, vec![ColumnDef::new("id")], "id");

        assert_eq!(coordinator.lifecycle(), Lifecycle::Initializing);
        assert_eq!(coordinator.resident_window(), window(&[0]));
        assert!(!coordinator.has_loaded_pages());
    }

    #[tokio::test]
    async fn test_refresh_loads_and_fires_initial_once() {
        let coordinator = PagingCoordinator::new(source(12), ConcurrencyLimiter::default());
        let initial = coordinator.initialize(5, vec![], "id");

        let report = coordinator.refresh().await.unwrap();
        assert_eq!(report.loaded, vec![0]);
        assert!(initial.wait().await);
        assert_eq!(coordinator.lifecycle(), Lifecycle::Ready);
        assert_eq!(coordinator.total_count(), 12);
        assert_eq!(coordinator.page_count(), Some(3));
    }

    #[tokio::test]
    async fn test_reinitialize_supersedes_pending_initial_load() {
        let coordinator = PagingCoordinator::new(source(12), ConcurrencyLimiter::default());
        let first = coordinator.initialize(5, vec![], "id");
        let second = coordinator.initialize(4, vec![], "id");

        assert!(!first.wait().await);
        coordinator.refresh().await.unwrap();
        assert!(second.wait().await);
    }

    #[tokio::test]
    async fn test_empty_plan_keeps_window() {
        let coordinator = PagingCoordinator::new(source(20), ConcurrencyLimiter::default());
        let _initial = coordinator.initialize(5, vec![], "id");
        coordinator
            .change_pages(&window(&[0, 1]), None, false, &[])
            .await
            .unwrap();

        let report = coordinator
            .change_pages(&BTreeSet::new(), None, false, &[])
            .await
            .unwrap();
        assert!(report.evicted.is_empty());
        assert_eq!(coordinator.resident_window(), window(&[0, 1]));
    }

    #[tokio::test]
    async fn test_loaded_page_not_refetched() {
        let coordinator = PagingCoordinator::new(source(20), ConcurrencyLimiter::default());
        let _initial = coordinator.initialize(5, vec![], "id");
        coordinator
            .change_pages(&window(&[0]), None, false, &[])
            .await
            .unwrap();

        let report = coordinator
            .change_pages(&window(&[0, 1]), None, false, &[])
            .await
            .unwrap();
        assert_eq!(report.requested, vec![1]);
    }

    #[tokio::test]
    async fn test_sort_change_refetches_window() {
        let coordinator = PagingCoordinator::new(source(20), ConcurrencyLimiter::default());
        let _initial = coordinator.initialize(5, vec![], "id");
        coordinator
            .change_pages(&window(&[0, 1]), None, false, &[])
            .await
            .unwrap();

        let report = coordinator
            .change_pages(&window(&[0, 1]), Some("id"), true, &[])
            .await
            .unwrap();
        assert_eq!(report.requested, vec![0, 1]);
        assert_eq!(coordinator.sort(), SortSpec::desc("id"));
        // "r9" > "r19" > ... lexicographically
        assert_eq!(coordinator.rows_state(0).unwrap()[0].id(), "r9");
    }

    #[tokio::test]
    async fn test_selected_ids_mark_incoming_rows() {
        let coordinator = PagingCoordinator::new(source(10), ConcurrencyLimiter::default());
        let _initial = coordinator.initialize(5, vec![], "id");
        coordinator
            .change_pages(&window(&[0]), None, false, &["r3".to_string()])
            .await
            .unwrap();

        let rows = coordinator.rows_state(0).unwrap();
        assert!(rows[3].is_selected());
        assert_eq!(rows.iter().filter(|r| r.is_selected()).count(), 1);
        assert_eq!(coordinator.selected_ids(), vec!["r3".to_string()]);
    }
}
