//! Moobot song-queue scraping library: snapshot extraction, title
//! normalization and the daily song store.

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod extract;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod safety;
pub mod store;
