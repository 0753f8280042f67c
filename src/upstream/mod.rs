pub mod client;

pub use client::{UpstreamClient, UpstreamRequest, DELETE_MESSAGE};
