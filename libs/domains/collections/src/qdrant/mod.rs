mod client;
mod config;

pub use client::QdrantConnection;
pub use config::QdrantConfig;
