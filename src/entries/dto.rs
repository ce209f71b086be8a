use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Editable nutrition fields of one meal.
#[derive(Debug, Clone, Deserialize)]
pub struct MealFields {
    pub description: String,
    #[serde(default)]
    pub calories: i32,
    #[serde(default)]
    pub protein: i32,
    #[serde(default)]
    pub carbs: i32,
    #[serde(default)]
    pub fats: i32,
}

/// One row of the day editor. Rows with an id update an existing entry;
/// rows without one become new entries. Existing entries missing from the
/// submitted set are deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRow {
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: MealFields,
}

#[derive(Debug, Deserialize)]
pub struct DaySaveRequest {
    pub rows: Vec<SaveRow>,
}

#[derive(Debug, Serialize)]
pub struct DaySaveResponse {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

fn collect_field_problems(label: &str, fields: &MealFields, problems: &mut Vec<String>) {
    if fields.description.trim().is_empty() {
        problems.push(format!("{label}: missing description"));
    }
    for (metric, value) in [
        ("calories", fields.calories),
        ("protein", fields.protein),
        ("carbs", fields.carbs),
        ("fats", fields.fats),
    ] {
        if value < 0 {
            problems.push(format!("{label}: negative {metric} ({value})"));
        }
    }
}

/// Checks every row before any write is attempted; all offending rows are
/// reported together, not just the first.
pub fn validate_rows(rows: &[SaveRow]) -> Result<(), AppError> {
    let mut problems = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        collect_field_problems(&format!("row {}", i + 1), &row.fields, &mut problems);
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems))
    }
}

pub fn validate_fields(fields: &MealFields) -> Result<(), AppError> {
    let mut problems = Vec::new();
    collect_field_problems("meal", fields, &mut problems);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<Uuid>, description: &str, calories: i32) -> SaveRow {
        SaveRow {
            id,
            fields: MealFields {
                description: description.into(),
                calories,
                protein: 0,
                carbs: 0,
                fats: 0,
            },
        }
    }

    #[test]
    fn every_offending_row_is_reported() {
        let rows = vec![
            row(None, "fine", 100),
            row(None, "  ", 200),
            row(None, "bad kcal", -5),
        ];
        match validate_rows(&rows).unwrap_err() {
            AppError::Validation(problems) => {
                assert_eq!(problems.len(), 2);
                assert!(problems[0].contains("row 2"));
                assert!(problems[1].contains("row 3"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_rows_pass() {
        assert!(validate_rows(&[row(None, "omelette", 300)]).is_ok());
        assert!(validate_rows(&[]).is_ok());
    }
}
