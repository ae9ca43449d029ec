use std::sync::Arc;

use studybot_ai::OllamaClient;

use crate::gateway::ProcessingLock;

/// Everything a request handler needs: the engine and the slot guarding it
#[derive(Debug)]
pub struct GatewayState {
    pub engine: OllamaClient,
    pub lock: Arc<ProcessingLock>,
}

impl GatewayState {
    pub fn new(engine: OllamaClient) -> Self {
        Self {
            engine,
            lock: Arc::new(ProcessingLock::new()),
        }
    }
}

/// Application state shared across all API handlers
pub type AppState = Arc<GatewayState>;
