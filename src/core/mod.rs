// Core modules implementing discovery, configuration, units and simulator-model loading.
pub mod collections;
pub mod compute_arguments;
pub mod config;
pub mod edn;
pub mod enumeration;
pub mod environment;
pub mod error;
pub mod library;
pub mod log;
pub mod metadata;
pub mod names;
pub mod path_set;
pub mod simulator_model;
pub mod units;
