//! `analyze` command: run the full pipeline for one hashtag.

use tagpulse_collector::{CollectStatus, HashtagClient};
use tagpulse_core::AppConfig;
use tagpulse_pipeline::{
    ModelHub, Pipeline, PipelineConfig, PipelineError, SentimentDistribution, TracingProgress,
};

use crate::MODEL_TIMEOUT;

/// Collect, clean, score and index posts for `hashtag`, then print a summary.
///
/// # Errors
///
/// Returns an error if the collector client cannot be built, the model
/// clients cannot be created, or no posts were collected.
pub(crate) async fn run_analyze(config: &AppConfig, hashtag: &str, limit: u32) -> anyhow::Result<()> {
    let source = HashtagClient::from_app_config(config)?;
    let hub = ModelHub::new(
        &config.sentiment_tei_url,
        &config.embedding_tei_url,
        MODEL_TIMEOUT,
    );
    let sentiment = hub.sentiment().await?;
    let embedder = hub.embedder().await?;
    let pipeline_config = PipelineConfig::from_app_config(config);

    let run = match Pipeline::new(&source, sentiment, embedder, &pipeline_config)
        .with_progress(&TracingProgress)
        .run(hashtag, limit)
        .await
    {
        Ok(run) => run,
        Err(PipelineError::NoDataCollected { hashtag, reason }) => {
            anyhow::bail!("no posts collected for #{hashtag}: {reason}");
        }
        Err(e) => return Err(e.into()),
    };

    let dist = SentimentDistribution::from_records(&run.records);
    println!("hashtag:     #{}", run.hashtag);
    println!("posts:       {}", run.records.len());
    if let Some(CollectStatus::Partial { reason }) = &run.collect_status {
        println!("collection:  partial ({reason})");
    }
    println!(
        "sentiment:   {} positive, {} neutral, {} negative, {} unprocessable, {} error",
        dist.positive, dist.neutral, dist.negative, dist.unprocessable, dist.error
    );
    println!("retrieval:   {:?}", run.retrieval_status());
    match &run.final_snapshot {
        Some(path) => println!("snapshot:    {}", path.display()),
        None => println!("snapshot:    not written (see log)"),
    }
    Ok(())
}
