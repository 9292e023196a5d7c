pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    audit_service::AuditService, center_service::CenterService,
    fulfillment_service::FulfillmentService, relay_service::RelayService,
    session_service::SessionService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub audit_service: AuditService,
    pub center_service: CenterService,
    pub session_service: SessionService,
    pub relay_service: RelayService,
    pub fulfillment_service: FulfillmentService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap();

        let audit_service = AuditService::new(pool.clone());
        let center_service = CenterService::new(pool.clone());
        let session_service = SessionService::new(pool.clone());
        let relay_service = RelayService::new(http_client.clone());
        let fulfillment_service = FulfillmentService::new(http_client);

        Self {
            pool,
            audit_service,
            center_service,
            session_service,
            relay_service,
            fulfillment_service,
        }
    }
}
