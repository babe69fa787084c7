pub mod aggregate;
pub mod app;
pub mod catalog;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod names;
pub mod output;
pub mod query;
pub mod targets;
pub mod uniprot;
