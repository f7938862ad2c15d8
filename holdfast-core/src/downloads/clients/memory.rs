//! An in-memory download client test double, used by tracker and reconciler
//! tests to simulate client progress without a real Transmission/SABnzbd
//! instance.

use std::path::PathBuf;

use async_trait::async_trait;
use holdfast_model::DownloadClientId;
use parking_lot::Mutex;

use crate::domain::Release;
use crate::downloads::client::{ClientStatus, DownloadClientPort};
use crate::error::CoreResult;

pub struct InMemoryDownloadClient {
    id: DownloadClientId,
    items: Mutex<Vec<ClientStatus>>,
    next_id: Mutex<u64>,
}

impl InMemoryDownloadClient {
    pub fn new(id: DownloadClientId) -> Self {
        InMemoryDownloadClient { id, items: Mutex::new(Vec::new()), next_id: Mutex::new(1) }
    }

    /// Test helper: directly mutate an item's reported progress/completion.
    pub fn set_status(&self, client_side_id: &str, progress: f32, done: bool, file_paths: Vec<PathBuf>) {
        let mut items = self.items.lock();
        if let Some(item) = items.iter_mut().find(|i| i.client_side_id == client_side_id) {
            item.progress = progress;
            item.done = done;
            item.file_paths = file_paths;
        }
    }

    pub fn set_errored(&self, client_side_id: &str) {
        let mut items = self.items.lock();
        if let Some(item) = items.iter_mut().find(|i| i.client_side_id == client_side_id) {
            item.errored = true;
        }
    }

    /// Test helper simulating a client restart that forgets an item.
    pub fn remove(&self, client_side_id: &str) {
        self.items.lock().retain(|i| i.client_side_id != client_side_id);
    }
}

#[async_trait]
impl DownloadClientPort for InMemoryDownloadClient {
    fn id(&self) -> DownloadClientId {
        self.id
    }

    async fn add(&self, release: &Release) -> CoreResult<String> {
        let mut next_id = self.next_id.lock();
        let client_side_id = format!("mem-{}", *next_id);
        *next_id += 1;
        self.items.lock().push(ClientStatus {
            client_side_id: client_side_id.clone(),
            name: release.title.clone(),
            file_paths: Vec::new(),
            progress: 0.0,
            size_bytes: release.size_bytes,
            speed_bytes_per_sec: 0,
            done: false,
            errored: false,
        });
        Ok(client_side_id)
    }

    async fn get(&self, client_side_id: &str) -> CoreResult<Option<ClientStatus>> {
        Ok(self.items.lock().iter().find(|i| i.client_side_id == client_side_id).cloned())
    }

    async fn list(&self) -> CoreResult<Vec<ClientStatus>> {
        Ok(self.items.lock().clone())
    }
}
