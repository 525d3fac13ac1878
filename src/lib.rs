//! ZakatGo chain gateway library.

pub mod blockchain;
pub mod config;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod storage;

pub use config::schema::GatewayConfig;
pub use gateway::ChainTransactionGateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
