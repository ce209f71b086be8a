use serde::Deserialize;

use crate::error::AppError;
use crate::store::RecipeFields;

#[derive(Debug, Clone, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instructions: String,
    pub servings: i32,
    #[serde(default)]
    pub calories_per_serving: i32,
    #[serde(default)]
    pub protein_per_serving: i32,
    #[serde(default)]
    pub carbs_per_serving: i32,
    #[serde(default)]
    pub fats_per_serving: i32,
    #[serde(default)]
    pub is_public: bool,
}

impl RecipePayload {
    /// Checks the whole payload and reports every problem together.
    pub fn validate(&self) -> Result<RecipeFields, AppError> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("recipe name must not be empty".to_string());
        }
        if self.servings < 1 {
            problems.push(format!("servings must be at least 1 (got {})", self.servings));
        }
        for (metric, value) in [
            ("calories_per_serving", self.calories_per_serving),
            ("protein_per_serving", self.protein_per_serving),
            ("carbs_per_serving", self.carbs_per_serving),
            ("fats_per_serving", self.fats_per_serving),
        ] {
            if value < 0 {
                problems.push(format!("negative {metric} ({value})"));
            }
        }
        if !problems.is_empty() {
            return Err(AppError::Validation(problems));
        }
        Ok(RecipeFields {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            servings: self.servings,
            calories_per_serving: self.calories_per_serving,
            protein_per_serving: self.protein_per_serving,
            carbs_per_serving: self.carbs_per_serving,
            fats_per_serving: self.fats_per_serving,
            is_public: self.is_public,
        })
    }
}

/// Logs a recipe as a meal on a given day.
#[derive(Debug, Deserialize)]
pub struct LogRecipeRequest {
    pub date: String,
    pub servings_eaten: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_validation_reports_all_problems() {
        let payload = RecipePayload {
            name: "  ".into(),
            description: String::new(),
            instructions: String::new(),
            servings: 0,
            calories_per_serving: -10,
            protein_per_serving: 20,
            carbs_per_serving: 30,
            fats_per_serving: 5,
            is_public: false,
        };
        match payload.validate().unwrap_err() {
            AppError::Validation(problems) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
