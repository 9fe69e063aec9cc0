use crate::config::Config;
use crate::store::{ContentDirectory, ProgressStore, UserDirectory};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub content: Arc<dyn ContentDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
