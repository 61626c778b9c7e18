//! # corpus2sql
//!
//! Batch converters that read line-oriented corpus dumps (plain, gzip or bz2)
//! and load them into normalized SQLite tables.
//!
//! The interesting part lives in [`corpus`]: a grammar-driven block reader, a
//! relational mapper that flattens block trees into parent-keyed rows, and an
//! ingestion pipeline that commits the whole run or rolls it back.

pub mod corpus;
