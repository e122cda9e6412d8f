use uuid::Uuid;

use super::ResourceType;
use crate::validation::{is_slug, length_between, FieldErrors};

const RANDOM_SUFFIX_LENGTH: usize = 10;

/// Lowercase `name`, turn every run of other characters into one hyphen
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(RANDOM_SUFFIX_LENGTH);
    suffix
}

/// Build a fresh id of the form `<base>-<random>` that fits `resource_type`'s id limit.
/// `base` is truncated as needed; an empty base yields only the random part.
pub fn generate_id(resource_type: ResourceType, base: &str) -> String {
    let budget = resource_type.max_id_length() - RANDOM_SUFFIX_LENGTH - 1;
    let mut base: String = base.chars().take(budget).collect();
    while base.ends_with('-') {
        base.pop();
    }

    if base.is_empty() {
        random_suffix()
    } else {
        format!("{}-{}", base, random_suffix())
    }
}

/// Join non-empty parts with hyphens, e.g. a parent id and a name slug
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

fn label(field: &str) -> String {
    let mut label = String::new();
    for (i, c) in field.chars().enumerate() {
        if c.is_ascii_uppercase() {
            label.push(' ');
            label.push(c);
        } else if i == 0 {
            label.push(c.to_ascii_uppercase());
        } else {
            label.push(c);
        }
    }
    label.replace(" Id", " ID")
}

/// Validate an id field against the limits of `resource_type`
pub fn validate_id(errors: &mut FieldErrors, field: &str, value: &str, resource_type: ResourceType) {
    let max = resource_type.max_id_length();
    let label = label(field);
    errors
        .check(
            length_between(value, 1, max),
            field,
            format!("{} must be between 1 and {} characters.", label, max),
        )
        .check(
            is_slug(value),
            field,
            format!("{} must contain only lowercase letters, numbers, and hyphens.", label),
        );
}

/// Validate an optional id field; absent is fine
pub fn validate_optional_id(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    resource_type: ResourceType,
) {
    if let Some(value) = value {
        validate_id(errors, field, value, resource_type);
    }
}

/// Validate a parent id. Crag parents (sub-areas) are not stored here, so they reuse crag limits.
pub fn validate_parent_id(errors: &mut FieldErrors, resource_type: ResourceType, value: &str) {
    let parent_type = resource_type.parent_type().unwrap_or(ResourceType::Crag);
    validate_id(errors, resource_type.parent_field(), value, parent_type);
}

pub fn validate_name(errors: &mut FieldErrors, value: &str) {
    errors
        .check(
            length_between(value.trim(), 1, 100),
            "name",
            "Name must be between 1 and 100 characters.",
        )
        .check(
            !slugify(value).is_empty(),
            "name",
            "Name must contain at least one letter or number.",
        );
}

pub fn validate_description(errors: &mut FieldErrors, value: &str) {
    errors.check(
        length_between(value, 0, 5000),
        "description",
        "Description must be at most 5000 characters.",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Red Rocks: Calico Basin! "), "red-rocks-calico-basin");
        assert_eq!(slugify("Épée"), "p-e");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn generated_ids_respect_limits() {
        let long_route = "r".repeat(ResourceType::Route.max_id_length());
        let id = generate_id(ResourceType::Point, &join(&[&long_route, "point"]));
        assert_eq!(id.len(), ResourceType::Point.max_id_length());
        assert!(id.starts_with(&long_route));
        assert!(id.contains("-point-"));

        let wall = generate_id(ResourceType::Wall, &join(&["crag-abc", &slugify("The Wall")]));
        assert!(wall.starts_with("crag-abc-the-wall-"));
        assert_eq!(wall.len(), "crag-abc-the-wall-".len() + RANDOM_SUFFIX_LENGTH);

        let mut errors = FieldErrors::new();
        validate_id(&mut errors, "wallId", &wall, ResourceType::Wall);
        assert!(errors.is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_id(ResourceType::Crag, "smith-rock");
        let b = generate_id(ResourceType::Crag, "smith-rock");
        assert_ne!(a, b);
    }

    #[test]
    fn truncation_never_leaves_double_hyphen() {
        let base = format!("{}-{}", "a".repeat(60), "b".repeat(20));
        let id = generate_id(ResourceType::Crag, &base);
        assert!(!id.contains("--"));
        assert!(id.len() <= ResourceType::Crag.max_id_length());
    }

    #[test]
    fn validate_id_reports_messages() {
        let mut errors = FieldErrors::new();
        validate_id(&mut errors, "nextWallId", "Bad_Id", ResourceType::Wall);
        assert_eq!(
            errors.get("nextWallId"),
            Some("Next Wall ID must contain only lowercase letters, numbers, and hyphens.")
        );

        let mut errors = FieldErrors::new();
        validate_id(&mut errors, "pointId", &"p".repeat(128), ResourceType::Point);
        assert_eq!(
            errors.get("pointId"),
            Some("Point ID must be between 1 and 127 characters.")
        );
    }
}
