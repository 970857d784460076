//! Order payment orchestration: queue-driven payment use cases backed by
//! DynamoDB and Stripe, plus the Stripe webhook receiver.

pub mod api;
pub mod cancellation;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod messaging;
pub mod payments;
pub mod services;
