use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DietaryTarget {
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
}

impl DietaryTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietaryTarget::Vegetarian => "vegetarian",
            DietaryTarget::Vegan => "vegan",
            DietaryTarget::GlutenFree => "gluten-free",
            DietaryTarget::DairyFree => "dairy-free",
        }
    }
}

/// A recipe-mutating request routed to the optimizer: either a dietary
/// conversion or a quantity-scaling factor.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformDirective {
    Diet(DietaryTarget),
    Scale(f64),
}

impl TransformDirective {
    /// Short description used in prompts and spoken responses.
    pub fn describe(&self) -> String {
        match self {
            TransformDirective::Diet(target) => format!("a {} version", target.as_str()),
            TransformDirective::Scale(factor) if *factor > 1.0 => {
                format!("a version scaled up {factor}x")
            }
            TransformDirective::Scale(factor) => format!("a version scaled down to {factor}x"),
        }
    }
}
