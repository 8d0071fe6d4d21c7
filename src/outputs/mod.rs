//! Everything produced after ingestion and training.
//!
//! # Submodules
//!
//! - [`summary`]: Flattens a trained model into a renderer-neutral [`summary::ModelSummary`]
//! - [`json`]: Writes that summary to dated JSON files for visualization front ends
//! - [`audio`]: Narrates article bodies into MP3 files, one per document
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     └── evening.json
//!
//! audio_output_dir/
//! ├── article_1.mp3
//! └── article_2.mp3
//! ```

pub mod audio;
pub mod json;
pub mod summary;
