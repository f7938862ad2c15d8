use std::sync::Arc;

use holdfast_core::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}
