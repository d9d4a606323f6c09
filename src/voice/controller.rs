use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::session::SessionController;
use crate::settings::VoiceSettings;

use super::loop_worker::{voice_loop, VoiceLoopSignal};
use super::speech::SpeechIo;

/// Lifecycle handle for the voice loop task. At most one loop runs at a time;
/// stopping cancels the loop and waits for it to finish the utterance it is
/// currently handling.
pub struct VoiceController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    control_tx: Option<mpsc::Sender<VoiceLoopSignal>>,
}

impl VoiceController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            control_tx: None,
        }
    }

    pub fn start_listening(
        &mut self,
        session_id: String,
        sessions: SessionController,
        speech: Arc<dyn SpeechIo>,
        settings: VoiceSettings,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("voice loop already active");
        }

        info!("Starting voice loop for session {session_id}");

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let (control_tx, control_rx) = mpsc::channel(4);

        let handle = tokio::spawn(voice_loop(
            session_id,
            sessions,
            speech,
            settings,
            control_rx,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.control_tx = Some(control_tx);
        Ok(())
    }

    /// Open the command window without waiting for the wake word (button
    /// press in a UI). No-op when no loop is running.
    pub fn enter_command_mode(&self) {
        if let Some(tx) = &self.control_tx {
            let _ = tx.try_send(VoiceLoopSignal::EnterCommandMode);
        }
    }

    /// Wait for the loop to finish on its own (speech source exhausted). A
    /// controller with no active loop returns immediately.
    pub async fn wait(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            self.cancel_token = None;
            self.control_tx = None;
            handle.await.context("voice loop task failed to join")?;
        }
        Ok(())
    }

    pub async fn stop_listening(&mut self) -> Result<()> {
        self.control_tx = None;
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("voice loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    pub fn is_listening(&self) -> bool {
        self.handle.is_some()
    }
}

impl Default for VoiceController {
    fn default() -> Self {
        Self::new()
    }
}
