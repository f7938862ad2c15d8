//! The download client interface: `add`, `get`, `list`, consumed by the
//! Download Tracker. Wire formats are treated as opaque — each concrete
//! client normalizes into [`ClientStatus`].

use std::path::PathBuf;

use async_trait::async_trait;
use holdfast_model::DownloadClientId;

use crate::domain::Release;
use crate::error::CoreResult;

/// Normalized status of one item as reported by a download client's
/// `list()`/`get()`.
#[derive(Debug, Clone)]
pub struct ClientStatus {
    pub client_side_id: String,
    pub name: String,
    pub file_paths: Vec<PathBuf>,
    /// 0.0..=100.0
    pub progress: f32,
    pub size_bytes: u64,
    pub speed_bytes_per_sec: u64,
    pub done: bool,
    /// The client reported a terminal error for this item (distinct from
    /// "not yet done"); drives the Tracker's "client reports an error"
    /// branch.
    pub errored: bool,
}

/// A capability port for one configured download client. `add` must be
/// idempotent on identical release URL.
///
/// `#[automock]` generates `MockDownloadClientPort` for handler-level unit
/// tests that need a client returning a specific status sequence without
/// standing up `InMemoryDownloadClient`'s own state machine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownloadClientPort: Send + Sync {
    fn id(&self) -> DownloadClientId;

    /// Submits a release for download, returning the client-side id the
    /// tracker will later correlate against `list()`/`get()`.
    async fn add(&self, release: &Release) -> CoreResult<String>;

    async fn get(&self, client_side_id: &str) -> CoreResult<Option<ClientStatus>>;

    /// Batch status fetch, invoked once per tick per client for batch
    /// efficiency.
    async fn list(&self) -> CoreResult<Vec<ClientStatus>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_port_reports_a_done_status() {
        let mut mock = MockDownloadClientPort::new();
        mock.expect_id().return_const(DownloadClientId::new(1));
        mock.expect_list().returning(|| {
            Ok(vec![ClientStatus {
                client_side_id: "abc".into(),
                name: "Inception".into(),
                file_paths: vec![PathBuf::from("/downloads/Inception.mkv")],
                progress: 100.0,
                size_bytes: 12_000,
                speed_bytes_per_sec: 0,
                done: true,
                errored: false,
            }])
        });

        assert_eq!(mock.id(), DownloadClientId::new(1));
        let statuses = mock.list().await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].done);
    }
}
