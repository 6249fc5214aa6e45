//! # Product Taxonomy
//!
//! A cache-aside UNSPSC/ETIM classification lookup service for product
//! catalogs: Redis in front, PostgreSQL as the system of record, and an
//! optional Neo4j knowledge-graph mirror for relationship queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────────┐   ┌────────────┐
//! │  Caller  │──▶│ ClassificationService  │──▶│   Redis    │
//! └──────────┘   │  validate → cache →    │   └────────────┘
//!                │  store → enrich → set  │   ┌────────────┐
//!                │                        │──▶│ PostgreSQL │
//!                │  (graph writes only)   │   └────────────┘
//!                │                        │   ┌────────────┐
//!                │                        │──▶│   Neo4j    │
//!                └────────────────────────┘   └────────────┘
//! ```
//!
//! The cache is a pure accelerator: every entry is reconstructible from
//! the reference store, each operation class has its own TTL, and a cache
//! outage degrades latency, never correctness. The store is authoritative;
//! a store outage degrades reads to empty results instead of crashing the
//! caller. Only the offline CSV importer fails loudly.
//!
//! ## Quick start
//!
//! ```bash
//! taxo init                              # create schema
//! taxo import unspsc ./data/unspsc.csv   # load licensed reference data
//! taxo lookup 25171501
//! taxo search "drill" --segment 27
//! taxo hierarchy 25171501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Typed TOML configuration |
//! | [`models`] | Reference-data and result types |
//! | [`hierarchy`] | Code-structure derivation (levels, ancestors, children) |
//! | [`scoring`] | Relevance and similarity heuristics |
//! | [`store`] | Reference store trait, PostgreSQL + in-memory backends |
//! | [`cache`] | Cache trait, Redis + in-memory backends, key builders |
//! | [`graph`] | Knowledge-graph trait, Neo4j + in-memory backends |
//! | [`service`] | The orchestrating classification service |
//! | [`import`] | Bulk CSV import |
//! | [`metrics`] | Advisory SLA telemetry |

pub mod cache;
pub mod config;
pub mod db;
pub mod graph;
pub mod hierarchy;
pub mod import;
pub mod metrics;
pub mod migrate;
pub mod models;
pub mod scoring;
pub mod service;
pub mod store;
