//! Data-access layer for a freelance marketplace persisted on a
//! ledger-backed relational table service.
//!
//! Every write is a blockchain transaction: repositories submit a
//! parameterized statement through the signer-bound gateway connection,
//! then block on the receipt endpoint until the transaction confirms.
//! Reads go straight to the gateway's query endpoint. The projects table
//! is provisioned lazily the first time a create needs it; both tables can
//! also be provisioned up front with [`db::Database::ensure_schema`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
