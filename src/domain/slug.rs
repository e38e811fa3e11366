//! Slug derivation for catalogue names.
//!
//! Slugs are a pure function of the display name: lowercased, trimmed,
//! punctuation dropped and whitespace collapsed into `-`. Uniqueness is not
//! resolved here by suffixing; callers reject collisions instead, and the
//! unique constraint in the store remains the final arbiter.

use slug::slugify;
use thiserror::Error;

/// Reserved slug addressing the "all products" pseudo-category.
pub const ALL_PRODUCTS_SLUG: &str = "all";

/// Errors that can occur while deriving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` is reserved")]
    Reserved { slug: String },
}

/// Derive a slug from the provided human-readable name.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(trimmed);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive a category slug, refusing the pseudo-category slug.
pub fn derive_category_slug(input: &str) -> Result<String, SlugError> {
    let slug = derive_slug(input)?;
    if slug == ALL_PRODUCTS_SLUG {
        return Err(SlugError::Reserved { slug });
    }
    Ok(slug)
}
