//! JSON output for visualization front ends.
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

use chrono::Local;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::errors::RenderError;
use crate::outputs::summary::ModelSummary;
use crate::utils::time_of_day;

/// Consumer of a [`ModelSummary`].
pub trait VisualizationRenderer {
    async fn render(&self, summary: &ModelSummary) -> Result<(), RenderError>;
}

/// Writes the summary as pretty JSON to `{dir}/{date}/{edition}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileRenderer {
    json_output_dir: PathBuf,
    local_date: String,
    edition: String,
}

impl JsonFileRenderer {
    /// Renderer for the current local date and edition.
    pub fn new(json_output_dir: impl Into<PathBuf>) -> Self {
        Self::for_edition(
            json_output_dir,
            Local::now().date_naive().to_string(),
            time_of_day(),
        )
    }

    pub fn for_edition(
        json_output_dir: impl Into<PathBuf>,
        local_date: impl Into<String>,
        edition: impl Into<String>,
    ) -> Self {
        Self {
            json_output_dir: json_output_dir.into(),
            local_date: local_date.into(),
            edition: edition.into(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.json_output_dir
            .join(&self.local_date)
            .join(format!("{}.json", self.edition))
    }
}

impl VisualizationRenderer for JsonFileRenderer {
    #[instrument(level = "info", skip_all, fields(json_output_dir = %self.json_output_dir.display()))]
    async fn render(&self, summary: &ModelSummary) -> Result<(), RenderError> {
        let json = serde_json::to_vec_pretty(summary)?;

        let full_json_dir = self.json_output_dir.join(&self.local_date);
        info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(&full_json_dir).await {
            error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
            return Err(RenderError::Io {
                path: full_json_dir.display().to_string(),
                source: e,
            });
        }

        let path = self.output_path();
        info!(path = %path.display(), "Writing JSON");
        fs::write(&path, json)
            .await
            .map_err(|source| RenderError::Io {
                path: path.display().to_string(),
                source,
            })?;
        info!(path = %path.display(), topics = summary.num_topics, "Wrote topic summary JSON");

        Ok(())
    }
}
