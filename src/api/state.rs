use crate::core::{AppConfig, Services};

pub struct AppState {
    pub services: Services,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(services: Services, config: AppConfig) -> Self {
        Self { services, config }
    }
}
