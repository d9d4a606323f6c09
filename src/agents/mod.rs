pub mod directive;
pub mod optimizer;

pub use directive::{DietaryTarget, TransformDirective};
pub use optimizer::{OpenAiOptimizer, RecipeOptimizer};
