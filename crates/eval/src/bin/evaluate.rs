//! Offline evaluation CLI (spec §6). Scores a batch of (query, answer,
//! context) samples with the internal LLM-as-judge evaluator and exits:
//!
//! - `0` — ran to completion and `avg_overall >= --threshold` (default 0.7)
//! - `1` — ran to completion but `avg_overall < --threshold`
//! - `2` — could not run (bad input, backend unavailable)

use std::process::ExitCode;
use std::sync::Arc;

use rag_core::{Evaluator, SearchResult};
use rag_eval::InternalEvaluator;
use rag_llm::{LlmConfig, OllamaBackend};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Sample {
    query: String,
    answer: String,
    #[serde(default)]
    context: Vec<String>,
}

fn parse_args() -> Result<(String, f32), String> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: evaluate <samples.jsonl> [--threshold 0.7]")?;
    let mut threshold = 0.7_f32;
    while let Some(flag) = args.next() {
        if flag == "--threshold" {
            let value = args.next().ok_or("--threshold requires a value")?;
            threshold = value.parse().map_err(|_| "--threshold must be a number".to_string())?;
        }
    }
    Ok((path, threshold))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let (path, threshold) = match parse_args() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            return ExitCode::from(2);
        }
    };

    let mut samples = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Sample>(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                eprintln!("malformed sample on line {}: {e}", i + 1);
                return ExitCode::from(2);
            }
        }
    }

    if samples.is_empty() {
        eprintln!("no samples to evaluate");
        return ExitCode::from(2);
    }

    let backend = match OllamaBackend::new(LlmConfig::default()) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!("failed to construct evaluator backend: {e}");
            return ExitCode::from(2);
        }
    };
    let evaluator = InternalEvaluator::new(backend);

    let mut overall_sum = 0.0;
    let mut failures = 0usize;
    for sample in &samples {
        let context: Vec<SearchResult> =
            sample.context.iter().enumerate().map(|(i, c)| SearchResult::new(i.to_string(), c.clone(), 1.0)).collect();

        let result = match evaluator.evaluate(&sample.query, &sample.answer, &context).await {
            Ok(result) => result,
            Err(e) => {
                eprintln!("evaluation failed for query {:?}: {e}", sample.query);
                return ExitCode::from(2);
            }
        };

        overall_sum += result.overall;
        let passed = result.is_acceptable(threshold);
        if !passed {
            failures += 1;
        }
        println!(
            "{{\"query\": {:?}, \"overall\": {:.3}, \"faithfulness\": {:.3}, \"relevance\": {:.3}, \"passed\": {passed}}}",
            sample.query, result.overall, result.faithfulness, result.relevance,
        );
    }

    let avg_overall = overall_sum / samples.len() as f32;
    println!(
        "summary: {} samples, {} failed, avg_overall={:.3}, threshold={:.2}",
        samples.len(),
        failures,
        avg_overall,
        threshold
    );

    if avg_overall >= threshold {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
