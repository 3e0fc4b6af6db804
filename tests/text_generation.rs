//! Model-backed text generation tests.
//! Run with: cargo test --features integration

#![cfg(feature = "integration")]

use sentiment_storyteller::error::Result;
use sentiment_storyteller::text_generation::{Qwen3Size, TextGenerationPipelineBuilder};

#[test]
fn completion_echoes_prompt() -> Result<()> {
    let pipeline = TextGenerationPipelineBuilder::qwen3(Qwen3Size::Size0_6B)
        .temperature(0.7)
        .max_len(60)
        .seed(42)
        .build()?;

    let prompt = "Write a dark or serious story about: the last lighthouse";
    let output = pipeline.run(prompt)?;

    assert!(output.text.starts_with(prompt));
    assert!(output.stats.prompt_tokens + output.stats.tokens_generated <= 60);
    Ok(())
}

#[test]
fn same_seed_same_story() -> Result<()> {
    let pipeline = TextGenerationPipelineBuilder::qwen3(Qwen3Size::Size0_6B)
        .temperature(0.9)
        .max_len(50)
        .seed(7)
        .build()?;

    let a = pipeline.run("Once upon a time")?;
    let b = pipeline.run("Once upon a time")?;
    assert_eq!(a.text, b.text);
    Ok(())
}
