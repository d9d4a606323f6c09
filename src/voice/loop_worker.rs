use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::session::{SessionController, VoiceCommandRequest};
use crate::settings::VoiceSettings;

use super::speech::SpeechIo;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_error, log_info, log_warn};

const ATTENTION_PROMPT: &str = "Yes?";
const COMMAND_FAILED: &str = "Something went wrong handling that.";

/// Out-of-band control messages for the loop, for button-driven UIs that
/// want to skip the wake word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceLoopSignal {
    EnterCommandMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Waiting for the wake word; all other speech is ignored.
    Passive,
    /// Wake word heard recently; utterances go straight to the session until
    /// the silence timeout expires.
    Command,
}

/// Two-mode listening loop driving one cooking session.
///
/// Passive mode discards everything that does not contain the wake word. An
/// utterance that carries a command after the wake word ("hey prep, next") is
/// dispatched immediately; a bare wake word opens a command window that stays
/// open until the cook goes silent for `silence_timeout_secs`. A
/// `VoiceLoopSignal` on the control channel opens the window without the wake
/// word. The loop exits on cancellation or when the speech source is
/// exhausted.
pub async fn voice_loop(
    session_id: String,
    sessions: SessionController,
    speech: Arc<dyn SpeechIo>,
    settings: VoiceSettings,
    mut control_rx: mpsc::Receiver<VoiceLoopSignal>,
    cancel_token: CancellationToken,
) {
    let wake_word = settings.wake_word.trim().to_lowercase();
    let silence_timeout = Duration::from_secs(settings.silence_timeout_secs);
    let settle_delay = Duration::from_millis(settings.settle_delay_ms);
    let cooldown = Duration::from_millis(settings.cooldown_ms);

    let mut mode = Mode::Passive;
    let mut control_open = true;

    log_info!(
        "Voice loop started for session {} (wake word: '{}')",
        session_id,
        wake_word
    );

    loop {
        let utterance = match mode {
            Mode::Passive => {
                tokio::select! {
                    heard = speech.listen() => heard,
                    signal = control_rx.recv(), if control_open => {
                        match signal {
                            Some(VoiceLoopSignal::EnterCommandMode) => {
                                log_info!("manual toggle, entering command mode");
                                mode = Mode::Command;
                            }
                            None => control_open = false,
                        }
                        continue;
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("voice loop shutting down");
                        break;
                    }
                }
            }
            Mode::Command => {
                tokio::select! {
                    heard = tokio::time::timeout(silence_timeout, speech.listen()) => {
                        match heard {
                            Ok(inner) => inner,
                            Err(_) => {
                                log_info!(
                                    "no command within {}s, returning to passive listening",
                                    settings.silence_timeout_secs
                                );
                                mode = Mode::Passive;
                                continue;
                            }
                        }
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("voice loop shutting down");
                        break;
                    }
                }
            }
        };

        let utterance = match utterance {
            Ok(Some(text)) => text,
            Ok(None) => {
                log_info!("speech source exhausted, stopping voice loop");
                break;
            }
            Err(err) => {
                log_error!("speech input failed for session {}: {err:?}", session_id);
                break;
            }
        };

        let command = match mode {
            Mode::Passive => match strip_wake_word(&utterance, &wake_word) {
                Some(remainder) => {
                    // Give the recognizer a beat before treating follow-up
                    // audio as a command; trailing wake-word syllables bleed
                    // into the next capture otherwise.
                    tokio::time::sleep(settle_delay).await;
                    mode = Mode::Command;
                    if remainder.is_empty() {
                        if let Err(err) = speech.say(ATTENTION_PROMPT).await {
                            log_warn!("failed to speak attention prompt: {err:?}");
                        }
                        continue;
                    }
                    remainder
                }
                None => {
                    log_info!("ignoring utterance without wake word: '{utterance}'");
                    continue;
                }
            },
            Mode::Command => {
                // Inside the command window the wake word is optional noise.
                strip_wake_word(&utterance, &wake_word).unwrap_or(utterance)
            }
        };

        if command.is_empty() {
            continue;
        }

        let request = VoiceCommandRequest {
            command,
            session_id: session_id.clone(),
        };

        match sessions.handle_command(&request).await {
            Ok(response) => {
                log_info!(
                    "command '{}' -> '{}'",
                    request.command,
                    response.response
                );
                if let Err(err) = speech.say(&response.response).await {
                    log_warn!("failed to speak response: {err:?}");
                }
            }
            Err(err) => {
                log_error!(
                    "command '{}' failed for session {}: {err}",
                    request.command,
                    session_id
                );
                if let Err(say_err) = speech.say(COMMAND_FAILED).await {
                    log_warn!("failed to speak error response: {say_err:?}");
                }
            }
        }

        // One command per wake: after the response and cool-down the loop
        // drops back to passive listening.
        tokio::time::sleep(cooldown).await;
        mode = Mode::Passive;
    }
}

/// Return the utterance with the wake word removed, or `None` when the wake
/// word is absent. A bare wake word yields an empty remainder.
///
/// Matching and slicing both happen on the lowercased utterance: lowercasing
/// can change a character's byte length ('İ' becomes "i̇"), so an offset found
/// in the lowered string must not be applied to the original. The remainder
/// comes out lowercased, which is what the classifier wants anyway.
fn strip_wake_word(utterance: &str, wake_word: &str) -> Option<String> {
    let lowered = utterance.to_lowercase();
    let position = lowered.find(wake_word)?;
    let after = &lowered[position + wake_word.len()..];
    Some(
        after
            .trim_start_matches([',', '.', '!', '?'])
            .trim()
            .to_string(),
    )
}
