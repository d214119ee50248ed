//! Outbound adapters: implementations of domain ports over external systems.

pub mod persistence;
