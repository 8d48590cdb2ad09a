//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes the records of a run to one timestamped JSON file
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── {export.directory}/
//!     ├── zapatos_20250506_093000.json
//!     └── zapatos_20250506_180512.json
//! ```

pub mod json;
