pub mod catalogue;
pub mod config;
pub mod error;
pub mod gateway;
pub mod locations;
pub mod models;
pub mod presentation;
pub mod rooms;
pub mod selection;
pub mod service;
pub mod steps;
pub mod workflow;

pub use config::ServiceConfig;
pub use error::{ConfigError, QuizError};
pub use gateway::{EstimationResult, Estimator, GatewayConfig, HttpEstimationGateway};
pub use models::*;
pub use service::{AppState, build_router, create_app, sweep_idle_sessions};
pub use workflow::{QuizFlow, build_quiz_graph};
