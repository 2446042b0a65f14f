//! Query resolver: question → retrieval → grounded prompt → answer.
//!
//! One synchronous request/response flow per question: embed the question
//! with the same model the index was built with, pull the top-K nearest
//! chunks, assemble a context-grounded prompt, and hand it to the
//! generation collaborator. Every collaborator failure is caught here and
//! surfaced as a readable answer string; the resolver never returns an
//! error to its caller and never crashes the surrounding context.

use tracing::warn;

use crate::config::Config;
use crate::embedding;
use crate::generate;
use crate::models::{Answer, RetrievalHit, SourceRef};
use crate::vector_store::VectorStore;

/// Answer a question against the current collection. Infallible by
/// contract: failures come back as the answer text.
pub async fn resolve(config: &Config, question: &str) -> Answer {
    let provider = match embedding::create_provider(&config.embedding) {
        Ok(p) => p,
        Err(e) => return error_answer(format!("Error initializing embedding provider: {}", e)),
    };

    let query_vector =
        match embedding::embed_query(provider.as_ref(), &config.embedding, question).await {
            Ok(v) => v,
            Err(e) => return error_answer(format!("Error embedding question: {}", e)),
        };

    let store = match VectorStore::new(&config.vector_store) {
        Ok(s) => s,
        Err(e) => return error_answer(format!("Error querying vector store: {}", e)),
    };

    let hits = match store.search(&query_vector, config.retrieval.top_k).await {
        Ok(h) => h,
        Err(e) => return error_answer(format!("Error querying vector store: {}", e)),
    };

    let context = numbered_context(&hits);
    let sources = build_sources(&hits);
    let prompt = build_prompt(question, &hits);

    let answer = match generate::generate(&config.generation, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "generation call failed");
            format!("Error calling generation service: {}", e)
        }
    };

    Answer {
        answer,
        context,
        sources,
    }
}

fn error_answer(message: String) -> Answer {
    Answer {
        answer: message,
        context: Vec::new(),
        sources: Vec::new(),
    }
}

/// Retrieved snippets numbered in rank order, as they appear in the prompt.
fn numbered_context(hits: &[RetrievalHit]) -> Vec<String> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}", i + 1, hit.text))
        .collect()
}

fn build_sources(hits: &[RetrievalHit]) -> Vec<SourceRef> {
    hits.iter()
        .map(|hit| SourceRef {
            source: hit.source.clone(),
            score: hit.score,
        })
        .collect()
}

/// Assemble the grounded prompt: numbered snippets under CONTEXT, then the
/// question under QUESTION, then the ANSWER cue. Zero hits still produce a
/// well-formed prompt with an empty context section.
fn build_prompt(question: &str, hits: &[RetrievalHit]) -> String {
    let context = numbered_context(hits).join("\n");
    format!(
        "You are a document analysis expert. Use the following document context \
         to answer the user's question:\n\nCONTEXT:\n{}\n\nQUESTION:\n{}\n\nANSWER:",
        context, question
    )
}

/// CLI entry point: resolve and print the answer with its sources.
pub async fn run_ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let result = resolve(config, question).await;

    println!("{}", result.answer);

    if !result.sources.is_empty() {
        println!();
        println!("sources:");
        for source in &result.sources {
            match source.score {
                Some(score) => println!("  {} (score: {:.4})", source.source, score),
                None => println!("  {}", source.source),
            }
        }
    }

    Ok(())
}
