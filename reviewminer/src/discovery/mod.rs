//! Query construction and dispatch against the discovery service

mod backend;
mod client;
mod miner;
pub mod query;
mod target;

pub use backend::{Environment, SearchBackend};
pub use client::DiscoveryClient;
pub use miner::ReviewMiner;
pub use query::{QueryBuilder, QuerySpec, COLLECTION_ID, ENVIRONMENT_ID};
pub use target::{CollectionRef, QueryTarget, TargetTable};
