//! A Transmission-like torrent client, selected by the download client
//! factory for releases with [`holdfast_model::Protocol::Torrent`].

use std::path::PathBuf;

use async_trait::async_trait;
use holdfast_model::DownloadClientId;
use serde::Deserialize;

use crate::domain::Release;
use crate::downloads::client::{ClientStatus, DownloadClientPort};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Deserialize)]
struct TorrentEntry {
    id: String,
    name: String,
    #[serde(rename = "percentDone")]
    percent_done: f32,
    #[serde(rename = "totalSize")]
    total_size: u64,
    #[serde(rename = "rateDownload")]
    rate_download: u64,
    #[serde(rename = "isFinished")]
    is_finished: bool,
    error: Option<i32>,
    files: Option<Vec<TorrentFile>>,
}

#[derive(Debug, Deserialize)]
struct TorrentFile {
    name: String,
}

pub struct TransmissionClient {
    id: DownloadClientId,
    base_url: String,
    download_dir: PathBuf,
    http: reqwest::Client,
}

impl TransmissionClient {
    pub fn new(id: DownloadClientId, base_url: impl Into<String>, download_dir: PathBuf, http: reqwest::Client) -> Self {
        TransmissionClient { id, base_url: base_url.into(), download_dir, http }
    }

    fn status_from(&self, entry: TorrentEntry) -> ClientStatus {
        let file_paths = entry
            .files
            .unwrap_or_default()
            .into_iter()
            .map(|f| self.download_dir.join(f.name))
            .collect();
        ClientStatus {
            client_side_id: entry.id,
            name: entry.name,
            file_paths,
            progress: entry.percent_done * 100.0,
            size_bytes: entry.total_size,
            speed_bytes_per_sec: entry.rate_download,
            done: entry.is_finished || entry.percent_done >= 1.0,
            errored: entry.error.map(|e| e != 0).unwrap_or(false),
        }
    }
}

#[async_trait]
impl DownloadClientPort for TransmissionClient {
    fn id(&self) -> DownloadClientId {
        self.id
    }

    async fn add(&self, release: &Release) -> CoreResult<String> {
        let url = release
            .submission_url()
            .ok_or_else(|| CoreError::invalid("release has neither download_url nor guid"))?;
        let response = self
            .http
            .post(format!("{}/transmission/rpc", self.base_url))
            .json(&serde_json::json!({
                "method": "torrent-add",
                "arguments": { "filename": url },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CoreError::external(format!(
                "transmission-like client returned {}",
                response.status()
            )));
        }
        #[derive(Deserialize)]
        struct AddResponse {
            arguments: AddArguments,
        }
        #[derive(Deserialize)]
        struct AddArguments {
            #[serde(rename = "torrent-added", alias = "torrent-duplicate")]
            torrent: TorrentAdded,
        }
        #[derive(Deserialize)]
        struct TorrentAdded {
            #[serde(rename = "hashString")]
            hash_string: String,
        }
        let parsed: AddResponse = response.json().await.map_err(CoreError::from)?;
        Ok(parsed.arguments.torrent.hash_string)
    }

    async fn get(&self, client_side_id: &str) -> CoreResult<Option<ClientStatus>> {
        Ok(self.list().await?.into_iter().find(|s| s.client_side_id == client_side_id))
    }

    async fn list(&self) -> CoreResult<Vec<ClientStatus>> {
        let response = self
            .http
            .post(format!("{}/transmission/rpc", self.base_url))
            .json(&serde_json::json!({
                "method": "torrent-get",
                "arguments": {
                    "fields": ["id", "name", "percentDone", "totalSize", "rateDownload",
                               "isFinished", "error", "files"],
                },
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CoreError::external(format!(
                "transmission-like client returned {}",
                response.status()
            )));
        }
        #[derive(Deserialize)]
        struct ListResponse {
            arguments: ListArguments,
        }
        #[derive(Deserialize)]
        struct ListArguments {
            torrents: Vec<TorrentEntry>,
        }
        let parsed: ListResponse = response.json().await.map_err(CoreError::from)?;
        Ok(parsed.arguments.torrents.into_iter().map(|t| self.status_from(t)).collect())
    }
}
