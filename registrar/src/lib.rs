//! Service registry binary: configuration bootstrap and server lifecycle.

pub mod bootstrap;
pub mod cli;
pub mod server;

pub use server::{shutdown_signal, RegistryServer};
