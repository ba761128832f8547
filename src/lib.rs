mod collections;
pub mod audit;
pub mod config;
pub mod gate;
pub mod network;
pub mod store;
pub mod types;
pub mod world;

pub use gate::QueryGate;
pub use network::Network;
pub use store::PositionStore;
pub use world::World;

mod prelude {
    pub(crate) use crate::collections::*;
    pub(crate) use crate::network::{client::Inbox, Inboxes, Response};
    pub(crate) use crate::types::*;
    pub(crate) use std::net::TcpStream;
    pub(crate) use std::{io, time};
}
