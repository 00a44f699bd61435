use std::sync::Arc;

use axum::extract::FromRef;
use boombox_core::Coordinator;

use crate::gateway::Gateway;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub coordinator: Arc<Coordinator>,
    pub gateway: Arc<Gateway>,
}
