//! Recipe search via TheMealDB

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::AssistantError;
use crate::services::{http_client, read_json};

const MEALDB_URL: &str = "https://www.themealdb.com/api/json/v1/1/search.php";

/// TheMealDB numbers ingredient fields 1 through 20
const MAX_INGREDIENTS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct MealSearch {
    pub meals: Option<Vec<HashMap<String, Option<String>>>>,
}

fn field<'a>(meal: &'a HashMap<String, Option<String>>, name: &str) -> Option<&'a str> {
    meal.get(name).and_then(|v| v.as_deref())
}

/// Title, "ingredient - measure" lines, then instructions
pub fn render(meal: &HashMap<String, Option<String>>) -> String {
    let title = field(meal, "strMeal").unwrap_or("Unknown Recipe");
    let instructions = field(meal, "strInstructions").unwrap_or("No instructions available");

    let ingredients: Vec<String> = (1..=MAX_INGREDIENTS)
        .filter_map(|i| {
            let ingredient = field(meal, &format!("strIngredient{}", i))?.trim();
            if ingredient.is_empty() {
                return None;
            }
            let measure = field(meal, &format!("strMeasure{}", i)).unwrap_or("").trim();
            Some(format!("{} - {}", ingredient, measure))
        })
        .collect();

    format!(
        "{}\n\nIngredients:\n{}\n\nInstructions:\n{}",
        title,
        ingredients.join("\n"),
        instructions
    )
}

pub struct RecipeClient {
    client: Client,
}

impl RecipeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub fn search(&self, dish: &str) -> Result<String, AssistantError> {
        debug!(dish, "searching recipes");
        let response = self.client.get(MEALDB_URL).query(&[("s", dish)]).send()?;

        let found: MealSearch = read_json(response)?;
        found
            .meals
            .and_then(|meals| meals.into_iter().next())
            .map(|meal| render(&meal))
            .ok_or(AssistantError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_meal() {
        let search: MealSearch = serde_json::from_str(
            r#"{"meals": [{
                "strMeal": "Pancakes",
                "strInstructions": "Mix and fry.",
                "strIngredient1": "Flour",
                "strMeasure1": "100g",
                "strIngredient2": "Eggs",
                "strMeasure2": "2",
                "strIngredient3": "",
                "strMeasure3": " ",
                "strIngredient4": null
            }]}"#,
        )
        .unwrap();

        let meal = &search.meals.unwrap()[0];
        assert_eq!(
            render(meal),
            "Pancakes\n\nIngredients:\nFlour - 100g\nEggs - 2\n\nInstructions:\nMix and fry."
        );
    }

    #[test]
    fn test_no_meals() {
        let search: MealSearch = serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(search.meals.is_none());
    }
}
