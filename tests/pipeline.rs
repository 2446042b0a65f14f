//! Pipeline tests through the library API: extraction feeding the chunker
//! offline, and a full ingest-and-ask scenario against a live local stack
//! (ignored by default).

use std::io::Write;

use docq::cascade;
use docq::chunk;
use docq::config::{ChunkingConfig, VectorStoreConfig};
use docq::embedding;
use docq::vector_store::{Point, VectorStore};

/// Minimal valid PDF containing the text "cascade probe phrase".
fn minimal_pdf_with_phrase() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 53 >> stream\nBT /F1 12 Tf 100 700 Td (cascade probe phrase) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o1).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o2).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o3).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o4).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o5).as_bytes());
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

#[test]
fn extracted_text_flows_into_chunker() {
    let mut pdf = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    pdf.write_all(&minimal_pdf_with_phrase()).unwrap();
    pdf.flush().unwrap();

    let strategies = cascade::default_strategies(200);
    let result = cascade::extract_document(pdf.path(), &strategies);
    assert!(result.succeeded(), "extraction failed: {:?}", result.reason);
    assert!(result.text.contains("cascade probe phrase"));

    let chunking = ChunkingConfig {
        chunk_size: 500,
        chunk_overlap: 50,
        min_chunk_len: 10,
    };
    let chunks = chunk::chunk_document("probe.txt", &result.text, &chunking);
    assert!(!chunks.is_empty());
    assert!(chunks[0].text.contains("cascade probe phrase"));
    assert_eq!(chunks[0].source, "probe.txt");
    assert_eq!(chunks[0].ordinal, 0);
}

/// Full ingest-and-retrieve scenario. Needs a vector store at
/// localhost:6333 and downloads the local embedding model on first run:
/// `cargo test --test pipeline -- --ignored`
#[tokio::test]
#[ignore = "requires a running vector store and the local embedding model"]
async fn end_to_end_ingest_and_retrieve() {
    let paragraph = "The quick brown fox jumps over the lazy dog. ".repeat(4);
    let document = format!("{}\n\n{}", paragraph, paragraph);

    let chunking = ChunkingConfig::default();
    let chunks = chunk::chunk_document("fox.txt", &document, &chunking);
    assert!(!chunks.is_empty());

    let embedding_config = docq::config::EmbeddingConfig::default();
    let provider = embedding::create_provider(&embedding_config).unwrap();
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedding::embed_texts(provider.as_ref(), &embedding_config, &texts)
        .await
        .unwrap();
    assert_eq!(vectors.len(), chunks.len());

    let store_config = VectorStoreConfig {
        collection: "docq_pipeline_test".to_string(),
        ..VectorStoreConfig::default()
    };
    let store = VectorStore::new(&store_config).unwrap();

    // Destructive rebuild, twice: the second pass must behave identically.
    for _ in 0..2 {
        if store.collection_exists().await.unwrap() {
            store.delete_collection().await.unwrap();
        }
        store.create_collection(provider.dims()).await.unwrap();
        let points: Vec<Point> = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(c, v)| Point::new(c.id.clone(), v.clone(), &c.text, &c.source))
            .collect();
        store.upsert_points(&points, true).await.unwrap();
    }

    let query_vector = embedding::embed_query(provider.as_ref(), &embedding_config, "What animal jumps?")
        .await
        .unwrap();
    let hits = store.search(&query_vector, 5).await.unwrap();

    assert!(!hits.is_empty());
    assert_eq!(hits[0].source, "fox.txt");
    assert!(hits[0].text.contains("fox"));

    store.delete_collection().await.unwrap();
}
