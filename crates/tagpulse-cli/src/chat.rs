//! `ask` and `chat` commands: question answering over a saved analysis.

use tagpulse_core::AppConfig;
use tagpulse_pipeline::{
    AnalysisRun, ChatResponder, ChatTurn, ModelHub, NoResponder, OpenAiChat, PipelineError,
    SessionContext,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::MODEL_TIMEOUT;

/// Chat backend chosen from configuration.
enum Responder {
    Remote(OpenAiChat),
    Disabled(NoResponder),
}

impl Responder {
    fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.chat_url {
            Some(url) => Ok(Self::Remote(OpenAiChat::new(
                url,
                config.chat_api_key.as_deref(),
                &config.chat_model,
                MODEL_TIMEOUT,
            )?)),
            None => {
                tracing::warn!("TAGPULSE_CHAT_URL not set, questions cannot be answered");
                Ok(Self::Disabled(NoResponder))
            }
        }
    }
}

impl ChatResponder for Responder {
    async fn answer(
        &self,
        question: &str,
        context: &[&str],
        history: &[ChatTurn],
    ) -> Result<String, PipelineError> {
        match self {
            Self::Remote(chat) => chat.answer(question, context, history).await,
            Self::Disabled(none) => none.answer(question, context, history).await,
        }
    }
}

/// Load the final snapshot for `hashtag` and try to enable semantic retrieval.
async fn load_session(
    config: &AppConfig,
    hub: &ModelHub,
    hashtag: &str,
) -> anyhow::Result<(SessionContext, AnalysisRun)> {
    let mut run = AnalysisRun::from_snapshot(&config.data_dir, hashtag).map_err(|e| {
        anyhow::anyhow!("no saved analysis for '{hashtag}' ({e}); run `tagpulse analyze` first")
    })?;
    let status = run.enable_semantic(hub.embedder().await?).await;
    tracing::info!(hashtag = %run.hashtag, retrieval = ?status, "session ready");

    let mut session = SessionContext::new(config.retrieval_top_k);
    session.set_analysis(run.clone());
    Ok((session, run))
}

fn model_hub(config: &AppConfig) -> ModelHub {
    ModelHub::new(
        &config.sentiment_tei_url,
        &config.embedding_tei_url,
        MODEL_TIMEOUT,
    )
}

/// Answer one question and print the reply.
///
/// # Errors
///
/// Returns an error if no final snapshot exists for `hashtag` or a client
/// cannot be built.
pub(crate) async fn run_ask(config: &AppConfig, hashtag: &str, question: &str) -> anyhow::Result<()> {
    let hub = model_hub(config);
    let responder = Responder::from_app_config(config)?;
    let (mut session, _) = load_session(config, &hub, hashtag).await?;

    let answer = session
        .ask(hub.embedder().await?, &responder, question)
        .await;
    println!("{answer}");
    Ok(())
}

/// Read questions from stdin until EOF or `exit`.
///
/// `reset` clears the conversation history.
///
/// # Errors
///
/// Returns an error if no final snapshot exists for `hashtag`, a client
/// cannot be built, or stdin/stdout fail.
pub(crate) async fn run_chat(config: &AppConfig, hashtag: &str) -> anyhow::Result<()> {
    let hub = model_hub(config);
    let responder = Responder::from_app_config(config)?;
    let (mut session, run) = load_session(config, &hub, hashtag).await?;
    let embedder = hub.embedder().await?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!(
        "chatting about #{} ({} posts). Type 'reset' to start over, 'exit' to quit.",
        run.hashtag,
        run.records.len()
    );

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "exit" | "quit" => break,
            "reset" => {
                session.reset();
                session.set_analysis(run.clone());
                println!("conversation cleared");
            }
            question => {
                let answer = session.ask(embedder, &responder, question).await;
                println!("{answer}");
            }
        }
    }
    Ok(())
}
