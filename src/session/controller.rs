use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use chrono::Utc;
use log::{info, warn};

use crate::{
    agents::{RecipeOptimizer, TransformDirective},
    db::Database,
    error::CoreError,
    models::{CookingSession, Cursor, Phase, Recipe, SessionStatus},
    timer::{TimerCoordinator, TimerStatus},
    voice::intent::{classify, Intent},
};

use super::{VoiceCommandRequest, VoiceResponse};

const UNRECOGNIZED_RESPONSE: &str = "Sorry, I didn't understand that command.";
const TRANSFORM_FAILED_RESPONSE: &str = "Sorry, I couldn't modify the recipe.";
const COMPLETE_RESPONSE: &str = "Recipe complete! Enjoy your meal.";

/// Owns the authoritative position within a recipe's two-phase step sequence.
///
/// All session mutations flow through this controller; no caller reads then
/// writes session or timer state on its own. The one slow call in the hot
/// path is the optimizer invocation inside `apply_transform`, which is guarded
/// so a second transform on the same session is rejected while the first is
/// outstanding.
#[derive(Clone)]
pub struct SessionController {
    db: Database,
    optimizer: Arc<dyn RecipeOptimizer>,
    timer: TimerCoordinator,
    transforms_in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SessionController {
    pub fn new(db: Database, optimizer: Arc<dyn RecipeOptimizer>, timer: TimerCoordinator) -> Self {
        Self {
            db,
            optimizer,
            timer,
            transforms_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn timer(&self) -> &TimerCoordinator {
        &self.timer
    }

    /// Create a session positioned at the first prep step (or the first cook
    /// step when the recipe has no prep phase) and arm the timer from it.
    pub async fn start_session(
        &self,
        recipe_id: &str,
    ) -> Result<(CookingSession, Recipe), CoreError> {
        let recipe = self
            .db
            .get_recipe(recipe_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("recipe", recipe_id.to_string()))?;

        let cursor = if recipe.prep_phase.is_empty() {
            Cursor::new(Phase::Cook, 0)
        } else {
            Cursor::new(Phase::Prep, 0)
        };

        let session = CookingSession::new(recipe.id.clone(), cursor);
        self.db.insert_session(&session).await?;
        info!("Started cooking session {} for '{}'", session.id, recipe.title);

        if let Some(step) = recipe.step_at(cursor.phase, cursor.index) {
            self.timer.on_step_changed(step).await;
        }

        Ok((session, recipe))
    }

    pub async fn get_session(&self, session_id: &str) -> Result<CookingSession, CoreError> {
        self.db
            .get_session(session_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("cooking session", session_id.to_string()))
    }

    /// Interpret one recognized utterance against a session and produce the
    /// spoken response plus advisory UI flags.
    pub async fn handle_command(
        &self,
        request: &VoiceCommandRequest,
    ) -> Result<VoiceResponse, CoreError> {
        let mut session = self.get_session(&request.session_id).await?;
        let recipe = self
            .db
            .get_recipe(&session.recipe_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("recipe", session.recipe_id.clone()))?;

        if let Err(err) = self
            .db
            .log_voice_command(&request.session_id, &request.command)
            .await
        {
            warn!("Failed to log voice command: {err:#}");
        }

        match classify(&request.command) {
            Intent::Advance => self.advance(&mut session, &recipe).await,
            Intent::Repeat => Ok(self.repeat(&session, &recipe)),
            Intent::QueryPrepPhase => Ok(self.phase_summary(&session, &recipe)),
            Intent::QueryTimeRemaining => Ok(self.time_remaining(&session, &recipe).await),
            Intent::ListIngredients => Ok(list_ingredients(&recipe)),
            Intent::PauseSession => self.pause_session(&mut session, &recipe).await,
            Intent::ResumeSession => self.resume_session(&mut session, &recipe).await,
            Intent::StartTimer => Ok(self.start_timer().await),
            Intent::PauseTimer => Ok(self.pause_timer().await),
            Intent::ResumeTimer => Ok(self.resume_timer().await),
            Intent::Transform(directive) => {
                match self.apply_transform(&mut session, &recipe, directive).await {
                    Ok(response) => Ok(response),
                    Err(err) if err.is_transform_failure() => {
                        warn!("Transform failed for session {}: {err}", session.id);
                        Ok(with_position(
                            VoiceResponse::spoken(TRANSFORM_FAILED_RESPONSE),
                            &session,
                            &recipe,
                        ))
                    }
                    Err(err) => Err(err),
                }
            }
            Intent::Unrecognized(_) => Ok(VoiceResponse::spoken(UNRECOGNIZED_RESPONSE)),
        }
    }

    /// Move the cursor forward one position. End of prep rolls into (cook, 0);
    /// the final cook step is a terminal fixed point: the session completes
    /// and further advances return the same final state.
    pub async fn advance(
        &self,
        session: &mut CookingSession,
        recipe: &Recipe,
    ) -> Result<VoiceResponse, CoreError> {
        if session.is_complete() {
            return Ok(with_position(
                VoiceResponse::spoken(COMPLETE_RESPONSE),
                session,
                recipe,
            ));
        }

        let previous = session.cursor;
        let cursor = session.cursor;
        let response_text = if recipe.is_last_overall(cursor.phase, cursor.index) {
            self.complete(session);
            // The final step's countdown must not outlive the session.
            self.timer.stop().await;
            COMPLETE_RESPONSE.to_string()
        } else if cursor.index + 1 < recipe.phase_len(cursor.phase) {
            session.cursor.index += 1;
            let instruction = recipe
                .step_at(session.cursor.phase, session.cursor.index)
                .unwrap_or_default();
            match session.cursor.phase {
                Phase::Prep => format!("Next prep step: {instruction}"),
                Phase::Cook => format!("Step {}: {}", session.cursor.index + 1, instruction),
            }
        } else {
            session.cursor = Cursor::new(Phase::Cook, 0);
            let instruction = recipe.step_at(Phase::Cook, 0).unwrap_or_default();
            format!("Prep complete! Starting cooking phase. Step 1: {instruction}")
        };

        self.db.update_session(session).await?;

        if session.cursor != previous {
            if let Some(step) = recipe.step_at(session.cursor.phase, session.cursor.index) {
                self.timer.on_step_changed(step).await;
            }
        }

        Ok(with_position(
            VoiceResponse::spoken(response_text),
            session,
            recipe,
        ))
    }

    fn complete(&self, session: &mut CookingSession) {
        session.status = SessionStatus::Completed;
        session.completed_at = Some(Utc::now());
        info!("Cooking session {} complete", session.id);
    }

    /// Speak the current step again; the cursor never moves.
    pub fn repeat(&self, session: &CookingSession, recipe: &Recipe) -> VoiceResponse {
        let text = match recipe.step_at(session.cursor.phase, session.cursor.index) {
            Some(step) => format!("Repeating: {step}"),
            None => "No current step to repeat.".to_string(),
        };
        with_position(VoiceResponse::spoken(text), session, recipe)
    }

    pub fn phase_summary(&self, session: &CookingSession, recipe: &Recipe) -> VoiceResponse {
        let text = match session.cursor.phase {
            Phase::Prep => {
                let steps: Vec<&str> = recipe
                    .prep_phase
                    .iter()
                    .map(|step| step.instruction.as_str())
                    .collect();
                format!("Prep phase includes: {}", steps.join("; "))
            }
            Phase::Cook => "Prep is complete. You're in the cooking phase now.".to_string(),
        };
        with_position(VoiceResponse::spoken(text), session, recipe)
    }

    async fn time_remaining(&self, session: &CookingSession, recipe: &Recipe) -> VoiceResponse {
        let timer = self.timer.get_state().await;
        let text = match timer.status {
            TimerStatus::Running | TimerStatus::Paused => format!(
                "About {} remaining on the timer.",
                format_remaining(timer.remaining_secs)
            ),
            TimerStatus::Armed => format!(
                "A {} timer is ready for this step. Say 'start timer' to begin.",
                format_remaining(timer.total_secs)
            ),
            TimerStatus::Completed => "The timer for this step is done.".to_string(),
            TimerStatus::Idle => "No timer is running for this step.".to_string(),
        };
        with_position(VoiceResponse::spoken(text), session, recipe)
    }

    async fn pause_session(
        &self,
        session: &mut CookingSession,
        recipe: &Recipe,
    ) -> Result<VoiceResponse, CoreError> {
        if session.is_complete() {
            return Ok(with_position(
                VoiceResponse::spoken(COMPLETE_RESPONSE),
                session,
                recipe,
            ));
        }

        session.status = SessionStatus::Paused;
        self.db.update_session(session).await?;
        Ok(with_position(
            VoiceResponse::spoken("Cooking session paused. Say 'resume' when ready to continue."),
            session,
            recipe,
        ))
    }

    async fn resume_session(
        &self,
        session: &mut CookingSession,
        recipe: &Recipe,
    ) -> Result<VoiceResponse, CoreError> {
        if session.is_complete() {
            return Ok(with_position(
                VoiceResponse::spoken(COMPLETE_RESPONSE),
                session,
                recipe,
            ));
        }

        session.status = SessionStatus::Active;
        self.db.update_session(session).await?;
        let text = match recipe.step_at(session.cursor.phase, session.cursor.index) {
            Some(step) => format!("Resuming cooking. Current step: {step}"),
            None => "Resuming cooking.".to_string(),
        };
        Ok(with_position(VoiceResponse::spoken(text), session, recipe))
    }

    async fn start_timer(&self) -> VoiceResponse {
        let (state, started) = self.timer.start().await;
        if started {
            VoiceResponse {
                should_start_timer: Some(true),
                ..VoiceResponse::spoken(format!(
                    "Timer started: {}.",
                    format_remaining(state.total_secs)
                ))
            }
        } else if state.status == TimerStatus::Running {
            VoiceResponse::spoken("The timer is already running.")
        } else {
            VoiceResponse::spoken("There's no timer for this step.")
        }
    }

    async fn pause_timer(&self) -> VoiceResponse {
        let (_, paused) = self.timer.pause().await;
        if paused {
            VoiceResponse {
                should_pause_timer: Some(true),
                ..VoiceResponse::spoken("Timer paused.")
            }
        } else {
            VoiceResponse::spoken("There's no running timer to pause.")
        }
    }

    async fn resume_timer(&self) -> VoiceResponse {
        let (_, resumed) = self.timer.resume().await;
        if resumed {
            VoiceResponse {
                should_resume_timer: Some(true),
                ..VoiceResponse::spoken("Timer resumed.")
            }
        } else {
            VoiceResponse::spoken("There's no paused timer to resume.")
        }
    }

    /// Re-derive the recipe through the optimizer and splice the replacement
    /// into the session.
    ///
    /// The cursor is reset to the start of the new recipe: step identities may
    /// have shifted incompatibly, so resuming mid-recipe against a re-derived
    /// step list is unsafe. On any failure the stored session is untouched.
    pub async fn apply_transform(
        &self,
        session: &mut CookingSession,
        recipe: &Recipe,
        directive: TransformDirective,
    ) -> Result<VoiceResponse, CoreError> {
        {
            let mut in_flight = self.transforms_in_flight.lock().unwrap();
            if !in_flight.insert(session.id.clone()) {
                return Err(CoreError::TransformBusy);
            }
        }

        let result = self.run_transform(session, recipe, &directive).await;

        self.transforms_in_flight
            .lock()
            .unwrap()
            .remove(&session.id);

        result
    }

    async fn run_transform(
        &self,
        session: &mut CookingSession,
        recipe: &Recipe,
        directive: &TransformDirective,
    ) -> Result<VoiceResponse, CoreError> {
        let draft = self.optimizer.transform(recipe, directive).await?;
        let draft = draft
            .validated()
            .map_err(|err| CoreError::Upstream(format!("optimizer returned incomplete recipe: {err}")))?;

        let new_recipe = Recipe::from_draft(draft, recipe.source_url.clone());
        self.db.insert_recipe(&new_recipe).await?;

        session.recipe_id = new_recipe.id.clone();
        session.cursor = if new_recipe.prep_phase.is_empty() {
            Cursor::new(Phase::Cook, 0)
        } else {
            Cursor::new(Phase::Prep, 0)
        };
        session.status = SessionStatus::Active;
        session.completed_at = None;
        self.db.update_session(session).await?;

        info!(
            "Session {} switched to transformed recipe {} ('{}')",
            session.id, new_recipe.id, new_recipe.title
        );

        if let Some(step) = new_recipe.step_at(session.cursor.phase, session.cursor.index) {
            self.timer.on_step_changed(step).await;
        }

        let first_step = new_recipe
            .step_at(session.cursor.phase, session.cursor.index)
            .map(String::from);

        Ok(VoiceResponse {
            current_step: first_step.clone(),
            current_phase: Some(session.cursor.phase.as_str().to_string()),
            is_complete: Some(false),
            new_recipe_id: Some(new_recipe.id.clone()),
            modified_recipe_title: Some(new_recipe.title.clone()),
            ..VoiceResponse::spoken(match first_step {
                Some(step) => format!(
                    "I've created {}: {}. Starting over from the first step: {}",
                    directive.describe(),
                    new_recipe.title,
                    step
                ),
                None => format!(
                    "I've created {}: {}.",
                    directive.describe(),
                    new_recipe.title
                ),
            })
        })
    }
}

fn with_position(
    mut response: VoiceResponse,
    session: &CookingSession,
    recipe: &Recipe,
) -> VoiceResponse {
    response.current_step = recipe
        .step_at(session.cursor.phase, session.cursor.index)
        .map(String::from);
    response.current_phase = Some(session.cursor.phase.as_str().to_string());
    response.is_complete = Some(session.is_complete());
    response
}

fn list_ingredients(recipe: &Recipe) -> VoiceResponse {
    if recipe.ingredients.is_empty() {
        return VoiceResponse::spoken("This recipe has no ingredients listed.");
    }
    let spoken: Vec<String> = recipe.ingredients.iter().map(|ing| ing.spoken()).collect();
    VoiceResponse::spoken(format!("Ingredients needed: {}", spoken.join("; ")))
}

fn format_remaining(secs: u32) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    match (minutes, seconds) {
        (0, s) => format!("{s} seconds"),
        (m, 0) if m == 1 => "1 minute".to_string(),
        (m, 0) => format!("{m} minutes"),
        (m, s) => format!("{m} minutes and {s} seconds"),
    }
}
