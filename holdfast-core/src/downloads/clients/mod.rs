//! Concrete [`super::client::DownloadClientPort`] implementations, selected
//! by a factory keyed on `download_clients.kind`.

pub mod factory;
pub mod memory;
pub mod sabnzbd;
pub mod transmission;

pub use factory::{build_client, protocol_for_kind};
pub use memory::InMemoryDownloadClient;
pub use sabnzbd::SabnzbdClient;
pub use transmission::TransmissionClient;
