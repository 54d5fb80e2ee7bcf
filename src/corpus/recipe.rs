//! Recipe markdown conventions: structure checks, metadata, and templates.
//!
//! A recipe is a markdown file with a `# ` title and `## Ingredients`,
//! `## Instructions` and `## Notes` sections. Ingredients are bullet lists,
//! instructions are numbered lists.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const REQUIRED_SECTIONS: [&str; 3] = ["## Ingredients", "## Instructions", "## Notes"];

#[allow(clippy::expect_used)]
static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\. ").expect("numbered item pattern is valid"));

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Summary metadata of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipeInfo {
    pub title: String,
    pub ingredient_count: usize,
    pub instruction_count: usize,
}

/// Check a recipe's markdown structure.
#[must_use]
pub fn validate(content: &str) -> Validation {
    let mut errors = Vec::new();

    if !content.contains("# ") {
        errors.push("Recipe must have a title (line starting with '# ')".to_string());
    }
    for section in REQUIRED_SECTIONS {
        if !content.contains(section) {
            errors.push(format!("Missing required section: {section}"));
        }
    }

    if let Some(body) = section_body(content, "## Ingredients") {
        if body.is_empty() {
            errors.push("Ingredients section cannot be empty".to_string());
        } else {
            errors.extend(
                non_blank_lines(body)
                    .filter(|line| !is_bullet(line))
                    .map(|line| format!("Ingredients must use bullet points (- or *): '{line}'")),
            );
        }
    }

    if let Some(body) = section_body(content, "## Instructions") {
        if body.is_empty() {
            errors.push("Instructions section cannot be empty".to_string());
        } else {
            errors.extend(
                non_blank_lines(body)
                    .filter(|line| !NUMBERED_ITEM.is_match(line))
                    .map(|line| {
                        format!("Instructions must use numbered lists (1. 2. 3. etc.): '{line}'")
                    }),
            );
        }
    }

    Validation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Extract title and list counts from a recipe.
#[must_use]
pub fn extract_info(content: &str) -> RecipeInfo {
    let title = content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    let ingredient_count = section_body(content, "## Ingredients")
        .map_or(0, |body| non_blank_lines(body).filter(|l| is_bullet(l)).count());

    let instruction_count = section_body(content, "## Instructions").map_or(0, |body| {
        non_blank_lines(body)
            .filter(|l| NUMBERED_ITEM.is_match(l))
            .count()
    });

    RecipeInfo {
        title,
        ingredient_count,
        instruction_count,
    }
}

/// The display title: the first line that starts with `# ` once trimmed.
#[must_use]
pub fn extract_title(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
}

/// Derive a title from a file name: `chocolate_chip-cookies.md` →
/// `Chocolate Chip Cookies`.
#[must_use]
pub fn title_from_filename(name: &str) -> String {
    name.replace(".md", "")
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// An empty recipe skeleton with the given title.
#[must_use]
pub fn template(title: &str) -> String {
    format!("# {title}\n\n## Ingredients\n\n- \n\n## Instructions\n\n1. \n\n## Notes\n\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_bullet(line: &str) -> bool {
    line.starts_with("- ") || line.starts_with("* ")
}

fn non_blank_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Trimmed text between `header` and the next `## ` (or the end).
///
/// The header must be followed by optional whitespace and a line break.
fn section_body<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let (_, after) = content.split_once(header)?;
    let leading = after.len() - after.trim_start().len();
    if !after[..leading].contains('\n') {
        return None;
    }
    let rest = &after[leading..];
    let end = rest.find("## ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOKIES: &str = "# Cookies\n\n## Ingredients\n\n- flour\n* sugar\n\n\
        ## Instructions\n\n1. Mix\n2. Bake\n\n## Notes\n\nCrunchy.\n";

    #[test]
    fn complete_recipe_is_valid() {
        let result = validate(COOKIES);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn reports_missing_sections() {
        let result = validate("just text");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors[0].contains("title"));
        assert!(result.errors.iter().any(|e| e.contains("## Notes")));
    }

    #[test]
    fn ingredients_must_be_bullets() {
        let content = COOKIES.replace("- flour", "flour");
        let result = validate(&content);
        assert_eq!(
            result.errors,
            vec!["Ingredients must use bullet points (- or *): 'flour'"]
        );
    }

    #[test]
    fn instructions_must_be_numbered() {
        let content = COOKIES.replace("2. Bake", "Bake it");
        let result = validate(&content);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("'Bake it'"));
    }

    #[test]
    fn empty_sections_are_errors() {
        let content = "# T\n\n## Ingredients\n\n## Instructions\n\n## Notes\n";
        let result = validate(content);
        assert_eq!(
            result.errors,
            vec![
                "Ingredients section cannot be empty",
                "Instructions section cannot be empty"
            ]
        );
    }

    #[test]
    fn template_is_structurally_complete() {
        let content = template("Soup");
        assert!(content.starts_with("# Soup\n"));
        for section in REQUIRED_SECTIONS {
            assert!(content.contains(section));
        }
    }

    #[test]
    fn extracts_info() {
        let info = extract_info(COOKIES);
        assert_eq!(info.title, "Cookies");
        assert_eq!(info.ingredient_count, 2);
        assert_eq!(info.instruction_count, 2);
    }

    #[test]
    fn title_skips_subheadings() {
        assert_eq!(
            extract_title("## Ingredients\n  # Real Title  \n"),
            Some("Real Title".to_string())
        );
        assert_eq!(extract_title("no heading"), None);
    }

    #[test]
    fn titles_from_filenames() {
        assert_eq!(
            title_from_filename("chocolate_chip-cookies.md"),
            "Chocolate Chip Cookies"
        );
        assert_eq!(title_from_filename("PASTA"), "Pasta");
    }
}
