//! Report output.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── tesla_091502.json
//!     └── electric-vehicles_134410.json
//! ```

pub mod json;
