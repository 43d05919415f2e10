//! Available menu items and their recipe timings.
//!
//! The catalog is owned upstream; this module only reads it and turns entries
//! into [`ScheduleTaskRequest`]s.

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::schedule::ScheduleTaskRequest;

const ID_COL: &str = "id";
const NAME_COL: &str = "name";
const CUISINE_COL: &str = "cuisine_type";
const PREP_COL: &str = "prep_minutes";
const COOK_COL: &str = "cook_minutes";
const METHODS_COL: &str = "cooking_methods";
const INGREDIENTS_COL: &str = "ingredients";
const PROCEDURE_COL: &str = "procedure";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    #[serde(default)]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub procedure: String,
}

impl Recipe {
    /// `None` when prep plus cook does not fit in a `u32`.
    pub fn total_minutes(&self) -> Option<u32> {
        self.prep_time_minutes.checked_add(self.cook_time_minutes)
    }

    /// Non-empty procedure lines, in order.
    pub fn procedure_steps(&self) -> Vec<&str> {
        self.procedure
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// A menu item that can be put on the prep list. Items without a recipe can
/// be listed but not scheduled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrepItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub recipe: Option<Recipe>,
}

impl PrepItem {
    pub fn to_task_request(&self) -> Option<ScheduleTaskRequest> {
        let recipe = self.recipe.as_ref()?;
        Some(ScheduleTaskRequest::new(
            self.id.clone(),
            self.name.clone(),
            recipe.prep_time_minutes,
            recipe.cook_time_minutes,
            recipe.cooking_methods.clone(),
        ))
    }

    fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self
                .cuisine_type
                .as_deref()
                .map(|c| c.to_lowercase().contains(&term))
                .unwrap_or(false)
    }
}

/// Items whose name or cuisine contains `term`, case-insensitively.
pub fn search_catalog<'a>(items: &'a [PrepItem], term: &str) -> Vec<&'a PrepItem> {
    items.iter().filter(|item| item.matches(term)).collect()
}

fn parse_optional_u32(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok()
}

fn split_list(s: &str) -> Vec<String> {
    s.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load the catalog from a `.json` array of [`PrepItem`] or from CSV.
pub fn load_catalog(path: &Path) -> Result<Vec<PrepItem>> {
    if !path.exists() {
        return Err(anyhow!("Catalog file not found at: {:?}", path));
    }
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file at {:?}", path))?;
        let items: Vec<PrepItem> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse catalog JSON at {:?}", path))?;
        return Ok(items);
    }
    load_catalog_csv(path)
}

/// CSV columns: `id,name,prep_minutes,cook_minutes,cooking_methods` plus the
/// optional `cuisine_type,ingredients,procedure`. List cells are `;`-separated.
/// A row with blank prep and cook times has no recipe.
pub fn load_catalog_csv(path: &Path) -> Result<Vec<PrepItem>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog CSV file at {:?}", path))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| column(name).ok_or_else(|| anyhow!("Column '{}' not found", name));

    let id_idx = required(ID_COL)?;
    let name_idx = required(NAME_COL)?;
    let prep_idx = required(PREP_COL)?;
    let cook_idx = required(COOK_COL)?;
    let methods_idx = required(METHODS_COL)?;
    let cuisine_idx = column(CUISINE_COL);
    let ingredients_idx = column(INGREDIENTS_COL);
    let procedure_idx = column(PROCEDURE_COL);

    let mut items = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        let optional_cell = |idx: Option<usize>| idx.map(|i| record.get(i).unwrap_or("").trim()).unwrap_or("");

        let id = cell(id_idx).to_string();
        let name = cell(name_idx).to_string();
        if id.is_empty() || name.is_empty() {
            continue;
        }

        let recipe = match (parse_optional_u32(cell(prep_idx)), parse_optional_u32(cell(cook_idx))) {
            (None, None) => None,
            (prep, cook) => Some(Recipe {
                prep_time_minutes: prep.unwrap_or(0),
                cook_time_minutes: cook.unwrap_or(0),
                cooking_methods: split_list(cell(methods_idx)),
                ingredients: split_list(optional_cell(ingredients_idx)),
                procedure: optional_cell(procedure_idx).replace("\\n", "\n"),
            }),
        };

        if recipe.as_ref().is_some_and(|r| r.total_minutes().is_none()) {
            warn!(row = row_index, id = %id, "skipping catalog row with out-of-range timings");
            continue;
        }

        let cuisine = optional_cell(cuisine_idx);
        items.push(PrepItem {
            id,
            name,
            cuisine_type: (!cuisine.is_empty()).then(|| cuisine.to_string()),
            recipe,
        });
    }

    if items.is_empty() {
        return Err(anyhow!("No valid catalog items loaded from {:?}", path));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn create_test_csv_file() -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "id,name,cuisine_type,prep_minutes,cook_minutes,cooking_methods,ingredients,procedure")?;
        writeln!(file, "a,Roast chicken,French,10,20,oven,chicken;salt,Season\\nRoast")?;
        writeln!(file, "b,Fried rice,Chinese,5,15,stovetop;wok,,")?;
        writeln!(file, "c,Green salad,,,,,,")?; // no recipe yet
        writeln!(file, ",Nameless,,1,1,,,")?; // empty id
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_catalog_csv_success() -> Result<()> {
        let file = create_test_csv_file()?;
        let items = load_catalog_csv(file.path())?;
        assert_eq!(items.len(), 3);

        let chicken = items.iter().find(|i| i.id == "a").unwrap();
        let recipe = chicken.recipe.as_ref().unwrap();
        assert_eq!(recipe.total_minutes(), Some(30));
        assert_eq!(recipe.cooking_methods, vec!["oven".to_string()]);
        assert_eq!(recipe.procedure_steps(), vec!["Season", "Roast"]);
        assert_eq!(chicken.cuisine_type.as_deref(), Some("French"));

        let rice = items.iter().find(|i| i.id == "b").unwrap();
        assert_eq!(rice.recipe.as_ref().unwrap().cooking_methods.len(), 2);

        let salad = items.iter().find(|i| i.id == "c").unwrap();
        assert!(salad.recipe.is_none());
        assert!(salad.to_task_request().is_none());
        Ok(())
    }

    #[test]
    fn test_to_task_request_sums_prep_and_cook() -> Result<()> {
        let file = create_test_csv_file()?;
        let items = load_catalog_csv(file.path())?;
        let req = items[0].to_task_request().unwrap();
        assert_eq!(req.task_id, "a");
        assert_eq!(req.duration_minutes, 30);
        assert!(req.check_consistent().is_ok());
        Ok(())
    }

    #[test]
    fn test_load_catalog_skips_out_of_range_timings() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "id,name,prep_minutes,cook_minutes,cooking_methods")?;
        writeln!(file, "a,Soup,4294967295,1,stovetop")?;
        writeln!(file, "b,Stock,5,15,stovetop")?;
        file.flush()?;
        let items = load_catalog_csv(file.path())?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "b");
        Ok(())
    }

    #[test]
    fn test_load_catalog_missing_column() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "id,name,prep_minutes,cooking_methods")?;
        writeln!(file, "a,Soup,10,stovetop")?;
        file.flush()?;
        let result = load_catalog_csv(file.path());
        assert!(result.unwrap_err().to_string().contains("Column 'cook_minutes' not found"));
        Ok(())
    }

    #[test]
    fn test_load_catalog_json() -> Result<()> {
        let mut file = Builder::new().suffix(".json").tempfile()?;
        write!(
            file,
            r#"[{{"id":"a","name":"Soup","recipe":{{"prep_time_minutes":5,"cook_time_minutes":25,"cooking_methods":["stovetop"]}}}}]"#
        )?;
        file.flush()?;
        let items = load_catalog(file.path())?;
        assert_eq!(items[0].recipe.as_ref().unwrap().total_minutes(), Some(30));
        Ok(())
    }

    #[test]
    fn test_load_catalog_file_not_found() {
        let result = load_catalog(Path::new("this_catalog_does_not_exist.csv"));
        assert!(result.unwrap_err().to_string().contains("Catalog file not found"));
    }

    #[test]
    fn test_search_catalog_by_name_or_cuisine() -> Result<()> {
        let file = create_test_csv_file()?;
        let items = load_catalog_csv(file.path())?;
        assert_eq!(search_catalog(&items, "RICE").len(), 1);
        assert_eq!(search_catalog(&items, "french")[0].id, "a");
        assert_eq!(search_catalog(&items, "").len(), 3);
        Ok(())
    }
}
