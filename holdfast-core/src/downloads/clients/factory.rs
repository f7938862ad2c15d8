//! Selects a [`DownloadClientPort`] variant from a stored `download_clients`
//! row's `kind`, instead of a caller hardcoding which client to build
//! (spec.md §9).

use std::path::PathBuf;
use std::sync::Arc;

use holdfast_model::Protocol;

use crate::downloads::client::DownloadClientPort;
use crate::error::{CoreError, CoreResult};
use crate::store::DownloadClientConfig;

use super::{SabnzbdClient, TransmissionClient};

/// The protocol a client of this `kind` submits releases over, used to key
/// the reconciler's protocol -> client map.
pub fn protocol_for_kind(kind: &str) -> CoreResult<Protocol> {
    match kind {
        "transmission" => Ok(Protocol::Torrent),
        "sabnzbd" => Ok(Protocol::Usenet),
        other => Err(CoreError::invalid(format!("unrecognized download_clients.kind {other:?}"))),
    }
}

pub fn build_client(
    client: &DownloadClientConfig,
    http: reqwest::Client,
) -> CoreResult<Arc<dyn DownloadClientPort>> {
    match client.kind.as_str() {
        "transmission" => Ok(Arc::new(TransmissionClient::new(
            client.id,
            client.base_url.clone(),
            PathBuf::from(&client.download_dir),
            http,
        ))),
        "sabnzbd" => Ok(Arc::new(SabnzbdClient::new(
            client.id,
            client.base_url.clone(),
            client.api_key.clone(),
            http,
        ))),
        other => Err(CoreError::invalid(format!("unrecognized download_clients.kind {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdfast_model::DownloadClientId;

    fn client(kind: &str) -> DownloadClientConfig {
        DownloadClientConfig {
            id: DownloadClientId::new(1),
            name: "primary".into(),
            kind: kind.into(),
            base_url: "http://localhost:9091".into(),
            api_key: "key".into(),
            download_dir: "/downloads".into(),
            enabled: true,
        }
    }

    #[test]
    fn transmission_kind_builds_a_torrent_client() {
        assert!(build_client(&client("transmission"), reqwest::Client::new()).is_ok());
        assert_eq!(protocol_for_kind("transmission").unwrap(), Protocol::Torrent);
    }

    #[test]
    fn sabnzbd_kind_builds_a_usenet_client() {
        assert!(build_client(&client("sabnzbd"), reqwest::Client::new()).is_ok());
        assert_eq!(protocol_for_kind("sabnzbd").unwrap(), Protocol::Usenet);
    }

    #[test]
    fn unrecognized_kind_is_rejected() {
        assert!(build_client(&client("deluge"), reqwest::Client::new()).is_err());
    }
}
