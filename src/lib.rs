//! Purpose: Discovery and loading of KIM collection items (model drivers, portable and simulator models).
//! Exports: `api` (stable surface), `core` (implementation modules), `abi` (C bridge),
//! Exports: `cli` (utility dispatch).
//! Role: Library backing the `kim-api-simulator-model` utility, tests and non-Rust simulators.
//! Invariants: Resolution reads an explicit `Environment`, never global process state.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod abi;
pub mod api;
pub mod cli;
pub mod core;
