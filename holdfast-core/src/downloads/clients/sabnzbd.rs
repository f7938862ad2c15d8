//! A SABnzbd-like usenet client, selected by the download client factory
//! for releases with [`holdfast_model::Protocol::Usenet`].

use std::path::PathBuf;

use async_trait::async_trait;
use holdfast_model::DownloadClientId;
use serde::Deserialize;

use crate::domain::Release;
use crate::downloads::client::{ClientStatus, DownloadClientPort};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Deserialize)]
struct QueueSlot {
    nzo_id: String,
    filename: String,
    percentage: String,
    mb: String,
    #[serde(rename = "timeleft")]
    _time_left: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct HistorySlot {
    nzo_id: String,
    name: String,
    bytes: u64,
    status: String,
    storage: String,
    fail_message: String,
}

pub struct SabnzbdClient {
    id: DownloadClientId,
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SabnzbdClient {
    pub fn new(id: DownloadClientId, base_url: impl Into<String>, api_key: impl Into<String>, http: reqwest::Client) -> Self {
        SabnzbdClient { id, base_url: base_url.into(), api_key: api_key.into(), http }
    }
}

#[async_trait]
impl DownloadClientPort for SabnzbdClient {
    fn id(&self) -> DownloadClientId {
        self.id
    }

    async fn add(&self, release: &Release) -> CoreResult<String> {
        let url = release
            .submission_url()
            .ok_or_else(|| CoreError::invalid("release has neither download_url nor guid"))?;

        #[derive(Deserialize)]
        struct AddResponse {
            status: bool,
            nzo_ids: Vec<String>,
        }

        let response: AddResponse = self
            .http
            .get(format!("{}/api", self.base_url))
            .query(&[
                ("mode", "addurl"),
                ("name", url),
                ("apikey", self.api_key.as_str()),
                ("output", "json"),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(CoreError::from)?;

        if !response.status {
            return Err(CoreError::external("sabnzbd-like client rejected add"));
        }
        response
            .nzo_ids
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::external("sabnzbd-like client returned no nzo id"))
    }

    async fn get(&self, client_side_id: &str) -> CoreResult<Option<ClientStatus>> {
        Ok(self.list().await?.into_iter().find(|s| s.client_side_id == client_side_id))
    }

    async fn list(&self) -> CoreResult<Vec<ClientStatus>> {
        #[derive(Deserialize)]
        struct QueueResponse {
            queue: QueueBody,
        }
        #[derive(Deserialize)]
        struct QueueBody {
            slots: Vec<QueueSlot>,
        }
        #[derive(Deserialize)]
        struct HistoryResponse {
            history: HistoryBody,
        }
        #[derive(Deserialize)]
        struct HistoryBody {
            slots: Vec<HistorySlot>,
        }

        let queue: QueueResponse = self
            .http
            .get(format!("{}/api", self.base_url))
            .query(&[("mode", "queue"), ("apikey", self.api_key.as_str()), ("output", "json")])
            .send()
            .await?
            .json()
            .await
            .map_err(CoreError::from)?;

        let history: HistoryResponse = self
            .http
            .get(format!("{}/api", self.base_url))
            .query(&[("mode", "history"), ("apikey", self.api_key.as_str()), ("output", "json")])
            .send()
            .await?
            .json()
            .await
            .map_err(CoreError::from)?;

        let mut out: Vec<ClientStatus> = queue
            .queue
            .slots
            .into_iter()
            .map(|slot| ClientStatus {
                client_side_id: slot.nzo_id,
                name: slot.filename,
                file_paths: Vec::new(),
                progress: slot.percentage.parse().unwrap_or(0.0),
                size_bytes: (slot.mb.parse::<f64>().unwrap_or(0.0) * 1024.0 * 1024.0) as u64,
                speed_bytes_per_sec: 0,
                done: false,
                errored: slot.status.eq_ignore_ascii_case("Failed"),
            })
            .collect();

        out.extend(history.history.slots.into_iter().map(|slot| ClientStatus {
            client_side_id: slot.nzo_id,
            name: slot.name,
            file_paths: vec![PathBuf::from(slot.storage)],
            progress: 100.0,
            size_bytes: slot.bytes,
            speed_bytes_per_sec: 0,
            done: slot.status.eq_ignore_ascii_case("Completed"),
            errored: slot.status.eq_ignore_ascii_case("Failed") || !slot.fail_message.is_empty(),
        }));

        Ok(out)
    }
}
