use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Seam between the voice loop and the speech hardware.
///
/// `listen` resolves with one recognized utterance, or `None` when the input
/// source is exhausted (stdin closed, microphone stream ended). `say` speaks a
/// response back to the cook. Implementations own their own buffering; the
/// loop never calls either method concurrently.
#[async_trait]
pub trait SpeechIo: Send + Sync {
    async fn listen(&self) -> Result<Option<String>>;
    async fn say(&self, text: &str) -> Result<()>;
}

/// Text stand-in for a microphone and speaker: reads utterances line-by-line
/// from stdin and prints responses to stdout.
pub struct ConsoleSpeech;

#[async_trait]
impl SpeechIo for ConsoleSpeech {
    async fn listen(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        let bytes = reader
            .read_line(&mut line)
            .await
            .context("failed to read from stdin")?;
        if bytes == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn say(&self, text: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!(">> {text}\n").as_bytes())
            .await
            .context("failed to write to stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
        Ok(())
    }
}
