pub mod recipe;
pub mod session;

pub use recipe::{CookStep, Ingredient, Phase, PrepStep, Recipe, RecipeDraft};
pub use session::{CookingSession, Cursor, SessionStatus};
