pub mod factory;
pub mod memory;
pub mod prowlarr;

pub use factory::build_provider;
pub use memory::InMemoryIndexerProvider;
pub use prowlarr::ProwlarrProvider;
