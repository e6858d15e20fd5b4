//! Host-facing grid facade.
//!
//! [`LiveGrid`] wires the pieces together the way a hosting view uses them:
//! column definitions and selection come in as inputs, the viewport reports
//! which pages it renders, and five event streams go out.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::GridConfig;
use crate::coordinator::InitialLoad;
use crate::coordinator::Lifecycle;
use crate::coordinator::PagingCoordinator;
use crate::coordinator::WindowChange;
use crate::debounce::ScrollDebouncer;
use crate::error::Error;
use crate::events::ClickEvent;
use crate::events::EventBroadcaster;
use crate::events::GridEvents;
use crate::events::Modifiers;
use crate::model::ColumnDef;
use crate::model::Page;
use crate::model::Row;
use crate::model::SortSpec;
use crate::planner::PageWindowPlanner;
use crate::rate_limit::ConcurrencyLimiter;
use crate::selection::SelectionIndex;
use crate::selection::SelectionMode;
use crate::source::DataSource;

#[derive(Debug)]
struct GridInner {
    config: GridConfig,
    coordinator: PagingCoordinator,
    selection: Mutex<SelectionIndex>,
    broadcaster: Mutex<EventBroadcaster>,
    columns_tx: watch::Sender<Vec<ColumnDef>>,
    scroll: Mutex<ScrollDebouncer<BTreeSet<usize>>>,
    initial: Mutex<Option<InitialLoad>>,
    shutdown: CancellationToken,
}

/// A windowed, selectable view over a paged data source.
///
/// Cheap to clone: clones share the same grid.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use livescroll_lib::GridConfig;
/// use livescroll_lib::LiveGrid;
/// use livescroll_lib::source::InMemorySource;
///
/// # async fn demo() -> Result<(), livescroll_lib::Error> {
/// let source = Arc::new(InMemorySource::new(Vec::new()));
/// let grid = LiveGrid::new(source, GridConfig::new().with_page_size(50))?;
///
/// let _sub = grid.events().select.subscribe(|rows| {
///     println!("{} rows selected", rows.len());
/// });
///
/// grid.refresh().await?;
/// grid.on_live_scroll(&["0", "1"]).await?;
/// grid.select(Some(["r5".to_string()].as_slice()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LiveGrid {
    inner: Arc<GridInner>,
}

impl LiveGrid {
    /// Creates a grid over `source`.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(source: Arc<dyn DataSource>, config: GridConfig) -> Result<Self, Error> {
        config.validate()?;

        let limiter = ConcurrencyLimiter::new(config.max_concurrent_fetches);
        let coordinator = PagingCoordinator::new(source, limiter);
        let broadcaster = EventBroadcaster::attach(coordinator.events());
        let (columns_tx, _) = watch::channel(Vec::new());

        Ok(Self {
            inner: Arc::new(GridInner {
                selection: Mutex::new(SelectionIndex::new(config.selection_mode)),
                broadcaster: Mutex::new(broadcaster),
                columns_tx,
                scroll: Mutex::new(ScrollDebouncer::new(config.scroll_debounce)),
                initial: Mutex::new(None),
                shutdown: CancellationToken::new(),
                coordinator,
                config,
            }),
        })
    }

    /// The grid's configuration.
    pub fn config(&self) -> &GridConfig {
        &self.inner.config
    }

    /// The paging coordinator behind this grid.
    pub fn coordinator(&self) -> &PagingCoordinator {
        &self.inner.coordinator
    }

    /// The host-facing event channels.
    ///
    /// Silent after [`teardown`](Self::teardown).
    pub fn events(&self) -> GridEvents {
        lock(&self.inner.broadcaster).outputs().clone()
    }

    fn selection(&self) -> MutexGuard<'_, SelectionIndex> {
        lock(&self.inner.selection)
    }

    fn scroll(&self) -> MutexGuard<'_, ScrollDebouncer<BTreeSet<usize>>> {
        lock(&self.inner.scroll)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Replaces the column definitions.
    ///
    /// Every column's `cell_width` is recomputed from its `width`. The new
    /// columns are sent with page requests from the next [`refresh`](Self::refresh).
    pub fn set_columns(&self, mut columns: Vec<ColumnDef>) {
        for column in &mut columns {
            column.reset_cell_width();
        }
        self.inner.columns_tx.send_replace(columns);
    }

    /// Stream of column definitions.
    pub fn columns(&self) -> watch::Receiver<Vec<ColumnDef>> {
        self.inner.columns_tx.subscribe()
    }

    /// Binds the host's selection without resolving it against resident rows.
    ///
    /// Resident rows and future fetches are marked from the new ids. No
    /// select event is emitted.
    pub fn set_selected(&self, ids: &[String]) {
        self.selection().replace(ids);
        self.inner.coordinator.set_selected_ids(ids);
    }

    /// Mirrors the host's selection mode.
    pub fn set_selection_mode(&self, mode: SelectionMode) {
        self.selection().set_mode(mode);
    }

    /// The current selection, sorted.
    pub fn selected_ids(&self) -> Vec<String> {
        self.selection().ids()
    }

    // =========================================================================
    // Paging
    // =========================================================================

    /// Re-initializes paging and loads the first page.
    ///
    /// Arms a fresh [`initial_load`](Self::initial_load) one-shot, resets the
    /// window to page 0, forgets the last settled scroll position and
    /// re-propagates the host selection.
    pub async fn refresh(&self) -> Result<WindowChange, Error> {
        let coordinator = &self.inner.coordinator;
        let columns = self.inner.columns_tx.borrow().clone();
        let initial = coordinator.initialize(
            self.inner.config.page_size,
            columns,
            self.inner.config.id_field.clone(),
        );
        *lock(&self.inner.initial) = Some(initial);
        self.scroll().reset();

        let ids = self.selection().ids();
        coordinator.set_selected_ids(&ids);
        coordinator.refresh().await
    }

    /// Takes the one-shot armed by the last [`refresh`](Self::refresh).
    ///
    /// Returns `None` if it was already taken or no refresh has run.
    pub fn initial_load(&self) -> Option<InitialLoad> {
        lock(&self.inner.initial).take()
    }

    /// Returns `true` once the first page of the current initialization has
    /// loaded.
    pub fn is_initialized(&self) -> bool {
        self.inner.coordinator.lifecycle() == Lifecycle::Ready
    }

    /// Plans the window for raw viewport markers and moves to it now.
    ///
    /// Invalid markers are dropped; if none are left the window is unchanged.
    pub async fn on_live_scroll<S: AsRef<str>>(&self, markers: &[S]) -> Result<WindowChange, Error> {
        let plan = self.planner().plan(markers);
        self.change_window(&plan).await
    }

    /// Re-fetches the current window with a new sort.
    pub async fn sort_by(&self, field: Option<&str>, descending: bool) -> Result<WindowChange, Error> {
        let coordinator = &self.inner.coordinator;
        let window = coordinator.resident_window();
        let ids = self.selection().ids();
        coordinator
            .change_pages(&window, field, descending, &ids)
            .await
    }

    /// The sort pages are fetched with.
    pub fn sort(&self) -> SortSpec {
        self.inner.coordinator.sort()
    }

    fn planner(&self) -> PageWindowPlanner {
        PageWindowPlanner::new()
            .with_overscan(self.inner.config.overscan_pages)
            .with_page_count(self.inner.coordinator.page_count())
    }

    async fn change_window(&self, plan: &BTreeSet<usize>) -> Result<WindowChange, Error> {
        let coordinator = &self.inner.coordinator;
        let sort = coordinator.sort();
        let ids = self.selection().ids();
        coordinator
            .change_pages(plan, sort.field(), sort.is_descending(), &ids)
            .await
    }

    // =========================================================================
    // Selection and interaction
    // =========================================================================

    /// Selects rows by id and emits one select event with the resolved rows.
    ///
    /// With `Some(ids)` the selection is replaced by `ids` first; with `None`
    /// the current selection is re-emitted. Does nothing at all while no page
    /// has loaded.
    ///
    /// The number of ids is expected to respect the selection mode; this is
    /// not checked.
    pub fn select(&self, ids: Option<&[String]>) {
        let coordinator = &self.inner.coordinator;
        if !coordinator.has_loaded_pages() {
            log::debug!("select ignored: no resident rows");
            return;
        }

        let ids = {
            let mut selection = self.selection();
            if let Some(ids) = ids {
                selection.replace(ids);
            }
            selection.ids()
        };
        coordinator.set_selected_ids(&ids);
        self.emit_selection();
    }

    /// Handles a click on a resident row.
    ///
    /// Emits the click event, then updates the selection according to the
    /// selection mode and `modifiers`. Returns `true` if the selection
    /// changed, in which case one select event follows. Unknown ids are
    /// ignored.
    pub fn click(&self, row_id: &str, modifiers: Modifiers) -> bool {
        let coordinator = &self.inner.coordinator;
        let Some((page, row)) = coordinator.find_row(row_id) else {
            log::debug!("click on unknown row {row_id}");
            return false;
        };
        coordinator.events().click.emit(&ClickEvent {
            row,
            page,
            modifiers,
        });

        let order: Vec<String> = coordinator
            .flatten()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        let ids = {
            let mut selection = self.selection();
            if !selection.apply_click(row_id, modifiers, &order) {
                return false;
            }
            selection.ids()
        };
        coordinator.set_selected_ids(&ids);
        self.emit_selection();
        true
    }

    /// Emits a double-click event for a resident row.
    ///
    /// Returns `false` if the row is not resident.
    pub fn double_click(&self, row_id: &str) -> bool {
        let coordinator = &self.inner.coordinator;
        match coordinator.find_row(row_id) {
            Some((_, row)) => {
                coordinator.events().double_click.emit(&row);
                true
            }
            None => false,
        }
    }

    fn emit_selection(&self) {
        let coordinator = &self.inner.coordinator;
        let rows = coordinator.flatten();
        let selected = self.selection().resolve(&rows);
        coordinator.events().select.emit(&selected);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Total row count of the dataset.
    pub fn total_count(&self) -> usize {
        self.inner.coordinator.total_count()
    }

    /// Stream of resident page snapshots.
    pub fn page_services(&self) -> watch::Receiver<Vec<Page>> {
        self.inner.coordinator.page_services()
    }

    /// Snapshot of the resident pages.
    pub fn pages(&self) -> Vec<Page> {
        self.inner.coordinator.pages()
    }

    /// All resident rows in page then row order.
    pub fn rows(&self) -> Vec<Row> {
        self.inner.coordinator.flatten()
    }

    /// Indices of the resident window.
    pub fn resident_window(&self) -> BTreeSet<usize> {
        self.inner.coordinator.resident_window()
    }

    // =========================================================================
    // Scroll listener
    // =========================================================================

    /// Starts a task that turns raw viewport markers into window changes.
    ///
    /// Markers pushed into the returned feed are planned, then held until the
    /// viewport has been quiet for `scroll_debounce`. A settled plan equal to
    /// the previous one is dropped. Dropping the feed applies any pending plan
    /// and ends the task; [`teardown`](Self::teardown) ends it immediately.
    ///
    /// Must be called within a Tokio runtime.
    pub fn listen_scroll(&self) -> ScrollFeed {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<String>>();
        let grid = self.clone();
        let shutdown = self.inner.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let deadline = grid.scroll().deadline();
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    markers = rx.recv() => match markers {
                        Some(markers) => {
                            let plan = grid.planner().plan(&markers);
                            if !plan.is_empty() {
                                grid.scroll().push(plan, Instant::now());
                            }
                        }
                        None => {
                            let settled = grid.scroll().flush();
                            if let Some(plan) = settled {
                                grid.apply_settled(&plan).await;
                            }
                            break;
                        }
                    },
                    _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        let settled = grid.scroll().poll(Instant::now());
                        if let Some(plan) = settled {
                            grid.apply_settled(&plan).await;
                        }
                    }
                }
            }
            log::debug!("scroll listener stopped");
        });

        ScrollFeed { tx }
    }

    async fn apply_settled(&self, plan: &BTreeSet<usize>) {
        if let Err(e) = self.change_window(plan).await {
            log::warn!("scroll window change failed: {e}");
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Releases every event forwarding subscription and stops the scroll
    /// listener.
    pub fn teardown(&self) {
        lock(&self.inner.broadcaster).teardown();
        self.inner.shutdown.cancel();
        log::debug!("grid torn down");
    }

    /// Returns `true` once [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

/// Sender half of a scroll listener.
#[derive(Debug, Clone)]
pub struct ScrollFeed {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl ScrollFeed {
    /// Reports the raw page markers currently rendered by the viewport.
    ///
    /// Returns `false` if the listener has stopped.
    pub fn push<S: AsRef<str>>(&self, markers: &[S]) -> bool {
        let markers = markers.iter().map(|m| m.as_ref().to_string()).collect();
        self.tx.send(markers).is_ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;
    use crate::model::Value;
    use crate::source::InMemorySource;

    fn grid(n: usize, page_size: usize) -> LiveGrid {
        let rows = (0..n)
            .map(|i| {
                let mut f = Fields::new();
                f.insert("id".into(), Value::from(format!("r{i}")));
                f
            })
            .collect();
        let config = GridConfig::new().with_page_size(page_size);
        LiveGrid::new(Arc::new(InMemorySource::new(rows)), config).unwrap()
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let source = Arc::new(InMemorySource::new(Vec::new()));
        let result = LiveGrid::new(source, GridConfig::new().with_page_size(0));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_set_columns_resets_cell_width() {
        let grid = grid(0, 10);
        let mut column = ColumnDef::new("name").with_width(120.0);
        column.cell_width = Some(3.0);
        grid.set_columns(vec![column, ColumnDef::new("id")]);

        let columns = grid.columns().borrow().clone();
        assert_eq!(columns[0].cell_width, Some(120.0));
        assert_eq!(columns[1].cell_width, None);
    }

    #[tokio::test]
    async fn test_refresh_loads_first_page() {
        let grid = grid(25, 10);
        grid.refresh().await.unwrap();

        assert!(grid.is_initialized());
        assert!(grid.initial_load().unwrap().wait().await);
        assert_eq!(grid.total_count(), 25);
        assert_eq!(grid.rows().len(), 10);
    }

    #[tokio::test]
    async fn test_select_before_load_is_noop() {
        let grid = grid(25, 10);
        let events = grid.events();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let _sub = events.select.subscribe(move |_| *c.lock().unwrap() += 1);

        grid.select(Some(ids(&["r1"]).as_slice()));
        assert!(grid.selected_ids().is_empty());
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_click_selects_per_mode() {
        let grid = grid(25, 10);
        grid.refresh().await.unwrap();

        assert!(grid.click("r2", Modifiers::default()));
        assert!(grid.click(
            "r4",
            Modifiers {
                shift: true,
                ctrl: false
            }
        ));
        assert_eq!(grid.selected_ids(), ids(&["r2", "r3", "r4"]));

        grid.set_selection_mode(SelectionMode::None);
        assert!(!grid.click("r7", Modifiers::default()));
        assert!(!grid.click("missing", Modifiers::default()));
    }

    #[tokio::test]
    async fn test_teardown_silences_events() {
        let grid = grid(25, 10);
        grid.refresh().await.unwrap();
        let events = grid.events();
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        let _sub = events.double_click.subscribe(move |_| *c.lock().unwrap() += 1);

        assert!(grid.double_click("r0"));
        grid.teardown();
        grid.teardown();
        assert!(grid.double_click("r0"));
        assert_eq!(*count.lock().unwrap(), 1);
        assert!(grid.is_torn_down());
    }
}
