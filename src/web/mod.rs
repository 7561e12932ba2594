pub mod broadcast;
pub mod registry;
pub mod server;
pub mod websocket;
