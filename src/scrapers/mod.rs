//! Result page retrieval and extraction.
//!
//! Harvesting talks to the outside world through two seams:
//!
//! | Concern | Module | Notes |
//! |---------|--------|-------|
//! | Retrieval | [`fetch`] | [`fetch::Fetcher`] trait; `reqwest` client with browser-like headers |
//! | Extraction | [`yahoo`] | CSS selectors over one parsed page, yielding raw fragments |
//!
//! Neither seam interprets what it returns; the normalizer and harvester do.

pub mod fetch;
pub mod yahoo;
