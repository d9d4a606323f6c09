use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use tokio::sync::broadcast;

use preppad::agents::{OpenAiOptimizer, RecipeOptimizer};
use preppad::db::Database;
use preppad::models::Recipe;
use preppad::scraper::RecipeScraper;
use preppad::session::SessionController;
use preppad::settings::SettingsStore;
use preppad::timer::{TimerCoordinator, TimerEvent};
use preppad::voice::{ConsoleSpeech, SpeechIo, VoiceController};

#[derive(Parser)]
#[command(name = "preppad", about = "Voice-guided cooking from any recipe URL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a recipe URL and rewrite it into a prep/cook workflow
    Parse { url: String },
    /// List saved recipes
    List,
    /// Mark or unmark a recipe as a favorite
    Favorite {
        recipe_id: String,
        #[arg(long)]
        remove: bool,
    },
    /// Start a voice-guided cooking session for a saved recipe
    Cook { recipe_id: String },
    /// Show or change voice-loop settings
    Config {
        #[arg(long)]
        wake_word: Option<String>,
        #[arg(long)]
        silence_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let data_dir = dirs::data_dir()
        .context("could not determine platform data directory")?
        .join("preppad");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let db = Database::new(data_dir.join("preppad.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    match cli.command {
        Command::Parse { url } => parse_recipe(&db, &settings, &url).await,
        Command::List => list_recipes(&db).await,
        Command::Favorite { recipe_id, remove } => favorite(&db, &recipe_id, remove).await,
        Command::Cook { recipe_id } => cook(&db, &settings, &recipe_id).await,
        Command::Config {
            wake_word,
            silence_timeout_secs,
        } => configure(&settings, wake_word, silence_timeout_secs),
    }
}

fn configure(
    settings: &SettingsStore,
    wake_word: Option<String>,
    silence_timeout_secs: Option<u64>,
) -> Result<()> {
    let mut voice = settings.voice();
    let changed = wake_word.is_some() || silence_timeout_secs.is_some();

    if let Some(word) = wake_word {
        voice.wake_word = word.trim().to_lowercase();
    }
    if let Some(secs) = silence_timeout_secs {
        voice.silence_timeout_secs = secs;
    }
    if changed {
        settings.update_voice(voice.clone())?;
    }

    println!("wake word:        '{}'", voice.wake_word);
    println!("silence timeout:  {}s", voice.silence_timeout_secs);
    Ok(())
}

async fn parse_recipe(db: &Database, settings: &SettingsStore, url: &str) -> Result<()> {
    let scraper = RecipeScraper::new();
    let optimizer = OpenAiOptimizer::from_settings(&settings.optimizer());

    info!("Fetching {url}");
    let scraped = scraper.fetch(url).await?;
    info!("Rewriting '{}' into a prep/cook workflow", scraped.title);

    let draft = optimizer.rewrite(&scraped).await?;
    let recipe = Recipe::from_draft(draft, url.to_string());
    db.insert_recipe(&recipe).await?;

    println!("Saved '{}' ({})", recipe.title, recipe.id);
    println!(
        "  {} ingredients, {} prep steps, {} cook steps",
        recipe.ingredients.len(),
        recipe.prep_phase.len(),
        recipe.cook_phase.len()
    );
    Ok(())
}

async fn list_recipes(db: &Database) -> Result<()> {
    let recipes = db.list_recipes().await?;
    if recipes.is_empty() {
        println!("No recipes saved yet. Try: preppad parse <url>");
        return Ok(());
    }

    let favorites = db.list_favorites().await?;
    for recipe in recipes {
        let star = if favorites.contains(&recipe.id) { "*" } else { " " };
        println!("{star} {}  {}", recipe.id, recipe.title);
    }
    Ok(())
}

async fn favorite(db: &Database, recipe_id: &str, remove: bool) -> Result<()> {
    let recipe = db
        .get_recipe(recipe_id)
        .await?
        .with_context(|| format!("no recipe with id {recipe_id}"))?;

    if remove {
        db.remove_favorite(recipe_id).await?;
        println!("Removed '{}' from favorites", recipe.title);
    } else {
        db.add_favorite(recipe_id).await?;
        println!("Added '{}' to favorites", recipe.title);
    }
    Ok(())
}

async fn cook(db: &Database, settings: &SettingsStore, recipe_id: &str) -> Result<()> {
    let optimizer = Arc::new(OpenAiOptimizer::from_settings(&settings.optimizer()));
    let timer = TimerCoordinator::new();
    let sessions = SessionController::new(db.clone(), optimizer, timer.clone());

    let speech: Arc<dyn SpeechIo> = Arc::new(ConsoleSpeech);
    let voice_settings = settings.voice();

    let (session, recipe) = sessions.start_session(recipe_id).await?;
    speech
        .say(&format!(
            "Let's cook {}. Say '{}' followed by a command. First step: {}",
            recipe.title,
            voice_settings.wake_word,
            recipe
                .step_at(session.cursor.phase, session.cursor.index)
                .unwrap_or("done!")
        ))
        .await?;

    // Announce timer completions out-of-band; the voice loop only speaks in
    // response to a command.
    let mut timer_events = timer.subscribe();
    let announcer = {
        let speech = Arc::clone(&speech);
        tokio::spawn(async move {
            loop {
                match timer_events.recv().await {
                    Ok(TimerEvent::Completed) => {
                        let _ = speech.say("Time's up for this step!").await;
                    }
                    Ok(_) => {}
                    // Falling behind the per-second tick stream is fine; only
                    // the completion matters here.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let mut voice = VoiceController::new();
    voice.start_listening(session.id.clone(), sessions, Arc::clone(&speech), voice_settings)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping cooking session {}", session.id);
        }
        result = voice.wait() => {
            result?;
        }
    }

    voice.stop_listening().await?;
    announcer.abort();
    Ok(())
}
