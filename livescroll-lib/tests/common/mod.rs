//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use livescroll_lib::error::SourceError;
use livescroll_lib::events::RowEvent;
use livescroll_lib::events::Subscription;
use livescroll_lib::events::GridEvents;
use livescroll_lib::model::Fields;
use livescroll_lib::model::Value;
use livescroll_lib::source::DataSource;
use livescroll_lib::source::PageRequest;
use livescroll_lib::source::PageResponse;
use tokio::sync::Notify;
use tokio::sync::oneshot;

/// A data source serving rows `r0..r{total-1}` with controllable timing.
///
/// A page can be held back until the test releases it, and a page can be
/// made to fail once. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    total: usize,
    /// Page k > 0 starts `overlap * k` rows early, repeating ids of page k-1.
    overlap: usize,
    requests: Mutex<Vec<PageRequest>>,
    gates: Mutex<HashMap<usize, oneshot::Receiver<()>>>,
    failures: Mutex<HashSet<usize>>,
    started: Notify,
}

/// Releases a held page fetch.
pub struct Gate {
    tx: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

impl ScriptedSource {
    pub fn new(total: usize) -> Arc<Self> {
        Arc::new(Self {
            total,
            ..Self::default()
        })
    }

    pub fn with_overlap(total: usize, overlap: usize) -> Arc<Self> {
        Arc::new(Self {
            total,
            overlap,
            ..Self::default()
        })
    }

    /// Holds the next fetch of `page` until the returned gate is released.
    pub fn hold(&self, page: usize) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(page, rx);
        Gate { tx }
    }

    /// Makes the next fetch of `page` fail.
    pub fn fail_once(&self, page: usize) {
        self.failures.lock().unwrap().insert(page);
    }

    pub fn request_count(&self, page: usize) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.page_index == page)
            .count()
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Waits until `page` has been requested at least `n` times.
    pub async fn wait_started(&self, page: usize, n: usize) {
        loop {
            let notified = self.started.notified();
            if self.request_count(page) >= n {
                return;
            }
            notified.await;
        }
    }

    fn rows_for(&self, request: &PageRequest) -> Vec<Fields> {
        let start = request
            .offset()
            .saturating_sub(self.overlap * request.page_index);
        let end = (request.offset() + request.page_size).min(self.total);
        (start..end)
            .map(|n| {
                let mut fields = Fields::new();
                fields.insert(request.id_field.clone(), Value::from(format!("r{n}")));
                fields.insert("n".to_string(), Value::from(n as i64));
                fields
            })
            .collect()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SourceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.started.notify_waiters();

        let gate = self.gates.lock().unwrap().remove(&request.page_index);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failures.lock().unwrap().remove(&request.page_index) {
            return Err(SourceError::unavailable("scripted failure"));
        }
        Ok(PageResponse::new(self.rows_for(request), self.total))
    }
}

/// Records every row lifecycle event.
#[derive(Default)]
pub struct Recorder {
    pub created: Arc<Mutex<Vec<RowEvent>>>,
    pub destroyed: Arc<Mutex<Vec<RowEvent>>>,
    _subs: Vec<Subscription>,
}

impl Recorder {
    pub fn attach(events: &GridEvents) -> Self {
        let created = Arc::new(Mutex::new(Vec::new()));
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&created);
        let d = Arc::clone(&destroyed);
        let subs = vec![
            events
                .row_create
                .subscribe(move |e| c.lock().unwrap().push(e.clone())),
            events
                .row_destroy
                .subscribe(move |e| d.lock().unwrap().push(e.clone())),
        ];
        Self {
            created,
            destroyed,
            _subs: subs,
        }
    }

    pub fn created(&self) -> Vec<RowEvent> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroyed(&self) -> Vec<RowEvent> {
        self.destroyed.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.created.lock().unwrap().clear();
        self.destroyed.lock().unwrap().clear();
    }
}

pub fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
