use std::path::PathBuf;

use server_api::ApiContext;
use shared::protocol::ConfigEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) events: broadcast::Sender<ConfigEvent>,
    pub(crate) version_path: PathBuf,
}
