//! Index builder: text artifacts → chunks → vectors → rebuilt collection.
//!
//! Rebuilds are destructive: the existing collection is dropped, recreated
//! with the provider's dimensionality and cosine distance, and bulk-loaded
//! from scratch. There is no incremental path; every run replaces the
//! prior index wholesale.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::chunk;
use crate::config::Config;
use crate::embedding;
use crate::models::Chunk;
use crate::vector_store::{Point, VectorStore};

/// Rebuild the vector collection from every text artifact on disk.
pub async fn run_index(config: &Config) -> Result<()> {
    let documents = load_text_artifacts(&config.ingest.text_dir)?;

    let mut chunks: Vec<Chunk> = Vec::new();
    for (source, text) in &documents {
        chunks.extend(chunk::chunk_document(source, text, &config.chunking));
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await?;

    if vectors.len() != chunks.len() {
        bail!(
            "Embedding count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }
    if let Some(first) = vectors.first() {
        if first.len() != provider.dims() {
            bail!(
                "Embedding dimensionality mismatch: provider says {}, got {}",
                provider.dims(),
                first.len()
            );
        }
    }

    let store = VectorStore::new(&config.vector_store)?;

    // Destructive rebuild: drop, recreate, reload.
    if store.collection_exists().await? {
        info!(collection = store.collection(), "dropping existing collection");
        store.delete_collection().await?;
    }
    store.create_collection(provider.dims()).await?;

    let points: Vec<Point> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| Point::new(chunk.id.clone(), vector, &chunk.text, &chunk.source))
        .collect();

    let mut uploaded = 0usize;
    for batch in points.chunks(config.vector_store.upsert_batch_size) {
        store.upsert_points(batch, true).await?;
        uploaded += batch.len();
    }

    println!("index");
    println!("  documents: {}", documents.len());
    println!("  chunks: {}", chunks.len());
    println!("  points uploaded: {}", uploaded);
    println!("  collection: {}", store.collection());
    println!("ok");

    Ok(())
}

/// Extract then index, the full ingestion flow.
pub async fn run_ingest(config: &Config, limit: Option<usize>) -> Result<()> {
    crate::cascade::run_extract(config, limit).await?;
    run_index(config).await
}

/// Load every `.txt` artifact from the text directory, sorted by name.
/// The artifact file name is the document's source identity in payloads.
fn load_text_artifacts(text_dir: &Path) -> Result<Vec<(String, String)>> {
    if !text_dir.exists() {
        bail!(
            "Text directory does not exist: {} (run `docq extract` first)",
            text_dir.display()
        );
    }

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(text_dir)
        .with_context(|| format!("Failed to read {}", text_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !path.extension().is_some_and(|ext| ext == "txt") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        documents.push((name, text));
    }

    documents.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(documents)
}
