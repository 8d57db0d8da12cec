use std::path::{Path, PathBuf};

use async_trait::async_trait;
use forecast_core::{
    ChartArtifact, ChartEntry, ChartMetadata, ChartStore, ForecastError, ForecastResult,
};

mod gallery;
mod render;

/// Filesystem-backed chart artifact store. Each chart is an HTML file with a
/// sidecar `.json` manifest; an `index.html` gallery is regenerated on every
/// mutation.
pub struct LocalChartStore {
    dir: PathBuf,
}

impl LocalChartStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ForecastError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ForecastError::ChartStore(format!("cannot create {:?}: {}", dir, e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self, filename: &str) -> PathBuf {
        self.dir
            .join(filename.trim_end_matches(".html"))
            .with_extension("json")
    }

    async fn regenerate_index(&self) -> Result<(), ForecastError> {
        let entries = self.scan().await?;
        let index = gallery::build_index(&entries);
        tokio::fs::write(self.dir.join("index.html"), index)
            .await
            .map_err(|e| ForecastError::ChartStore(format!("cannot write index: {}", e)))
    }

    async fn scan(&self) -> Result<Vec<ChartEntry>, ForecastError> {
        let mut read_dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ForecastError::ChartStore(format!("cannot read {:?}: {}", self.dir, e)))?;

        let mut entries = Vec::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| ForecastError::ChartStore(e.to_string()))?
        {
            let filename = item.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(".html") || filename.eq_ignore_ascii_case("index.html") {
                continue;
            }

            let manifest = self.manifest_path(&filename);
            let metadata: ChartMetadata = match tokio::fs::read(&manifest).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(meta) => meta,
                    Err(e) => {
                        tracing::warn!("Skipping {} with bad manifest: {}", filename, e);
                        continue;
                    }
                },
                Err(_) => {
                    tracing::warn!("Skipping {} without manifest", filename);
                    continue;
                }
            };

            entries.push(ChartEntry { filename, metadata });
        }

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }
}

/// Rejects anything that could escape the chart directory.
fn validate_filename(filename: &str) -> Result<(), ForecastError> {
    if filename.is_empty()
        || !filename.ends_with(".html")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(ForecastError::ChartStore(format!(
            "invalid chart filename: {:?}",
            filename
        )));
    }
    Ok(())
}

#[async_trait]
impl ChartStore for LocalChartStore {
    fn render(
        &self,
        result: &ForecastResult,
        metadata: &ChartMetadata,
    ) -> Result<ChartArtifact, ForecastError> {
        render::render_chart(result, metadata)
    }

    async fn save(
        &self,
        artifact: ChartArtifact,
        metadata: &ChartMetadata,
    ) -> Result<String, ForecastError> {
        let filename = format!("{}.html", artifact.filename_stem);
        validate_filename(&filename)?;

        let html_path = self.dir.join(&filename);
        tokio::fs::write(&html_path, artifact.html)
            .await
            .map_err(|e| ForecastError::ChartStore(format!("cannot write chart: {}", e)))?;

        let manifest = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ForecastError::ChartStore(e.to_string()))?;
        tokio::fs::write(self.manifest_path(&filename), manifest)
            .await
            .map_err(|e| ForecastError::ChartStore(format!("cannot write manifest: {}", e)))?;

        self.regenerate_index().await?;

        tracing::info!("Saved chart {:?}", html_path);
        Ok(filename)
    }

    async fn list(&self) -> Result<Vec<ChartEntry>, ForecastError> {
        self.scan().await
    }

    async fn delete(&self, filename: &str) -> Result<bool, ForecastError> {
        validate_filename(filename)?;

        let html_path = self.dir.join(filename);
        let existed = match tokio::fs::remove_file(&html_path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                return Err(ForecastError::ChartStore(format!(
                    "cannot delete {:?}: {}",
                    html_path, e
                )))
            }
        };

        // Manifest absence is not an error; it may never have been written.
        let _ = tokio::fs::remove_file(self.manifest_path(filename)).await;

        if existed {
            self.regenerate_index().await?;
            tracing::info!("Deleted chart {}", filename);
        }

        Ok(existed)
    }
}
