//! Quote-card catalog engine: binary catalog decoding, text normalization,
//! season/episode filtering, cached substring search, and shareable
//! query-string state. The `qcard` binary is a terminal front-end over this.

pub mod cache;
pub mod catalog;
pub mod constants;
pub mod filter;
pub mod links;
pub mod normalize;
pub mod query;
pub mod urlstate;
pub mod wire;
