//! Main module for corpus loading functionality
//!
//! Data flows one way: [`source`] → [`reading`] → [`mapping`] → [`sink`], driven
//! by [`pipeline`]. Each supported corpus is described in [`formats`] as a
//! grammar plus a table schema.

pub mod block;
pub mod config;
pub mod formats;
pub mod grammar;
pub mod literal;
pub mod mapping;
pub mod pipeline;
pub mod reading;
pub mod schema;
pub mod sink;
pub mod source;
pub mod testing;
