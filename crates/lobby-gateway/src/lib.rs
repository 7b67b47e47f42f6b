//! # lobby-gateway
//!
//! Front-end server: one session per WebSocket connection, plus the inbound
//! endpoint peers use to push channel messages to those sessions.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod rpc;
pub mod server;

pub use server::{
    assemble_state, create_app, create_gateway_state, create_router, run, GatewayState,
};
