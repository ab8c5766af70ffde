use crate::store::MoodHistoryStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MoodHistoryStore>,
}

impl AppState {
    pub fn new(store: impl MoodHistoryStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}
