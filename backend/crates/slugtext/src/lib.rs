//! Deterministic text-to-slug primitives.
//!
//! This crate holds the pure building blocks the directory backend uses to
//! turn human-entered names into URL-safe identifiers: a total, deterministic
//! [`normalize`] function, the slug format grammar ([`validate`]), and the
//! suffix rendering used by collision resolution ([`with_suffix`]).
//!
//! Nothing here touches a store or performs I/O. Determinism is a hard
//! requirement: collision resolution re-derives the base slug on every retry
//! and must get byte-identical results, so normalization uses only
//! locale-independent ASCII casing and no randomness.

/// Minimum length of a valid slug, in characters.
pub const MIN_LENGTH: usize = 3;

/// Maximum length of a valid slug, in characters.
pub const MAX_LENGTH: usize = 100;

/// Normalize free text into a slug-safe token.
///
/// The transformation lowercases ASCII letters, drops every character outside
/// lowercase letters, digits, whitespace, and hyphens, collapses runs of
/// whitespace or hyphens into a single hyphen, and never emits a leading or
/// trailing hyphen. Empty or whitespace-only input yields an empty string;
/// callers treat that as a data-quality failure, not a fallback.
///
/// Characters that are neither alphanumeric nor separators are removed
/// without acting as a word boundary, so `"Dr. O'Neill"` becomes
/// `"dr-oneill"` rather than `"dr-o-neill"`.
///
/// # Examples
///
/// ```
/// assert_eq!(slugtext::normalize("City Dental Clinic"), "city-dental-clinic");
/// assert_eq!(slugtext::normalize("  Dr. Jane   Smith "), "dr-jane-smith");
/// assert_eq!(slugtext::normalize("!!!"), "");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut separator_pending = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if separator_pending && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            separator_pending = false;
        } else if ch.is_whitespace() || ch == '-' {
            separator_pending = true;
        }
        // Everything else (punctuation, non-ASCII) is stripped outright.
    }

    slug
}

/// Render the `N`th candidate for a base slug.
///
/// Counter `1` is the unsuffixed base itself; collision resolution starts
/// suffixing at `2`, producing `base-2`, `base-3`, and so on.
///
/// # Examples
///
/// ```
/// assert_eq!(slugtext::with_suffix("city-dental-clinic", 2), "city-dental-clinic-2");
/// ```
#[must_use]
pub fn with_suffix(base: &str, counter: u32) -> String {
    format!("{base}-{counter}")
}

/// A violation of the slug format grammar.
///
/// The grammar accepts `^[a-z0-9]+(-[a-z0-9]+)*$` with a total length of
/// [`MIN_LENGTH`] to [`MAX_LENGTH`] characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugFormatViolation {
    /// The slug is empty.
    #[error("slug is empty")]
    Empty,
    /// The slug is shorter than [`MIN_LENGTH`].
    #[error("slug is {length} characters long; the minimum is 3")]
    TooShort {
        /// Observed length in characters.
        length: usize,
    },
    /// The slug is longer than [`MAX_LENGTH`].
    #[error("slug is {length} characters long; the maximum is 100")]
    TooLong {
        /// Observed length in characters.
        length: usize,
    },
    /// The slug contains a character outside lowercase ASCII letters, digits,
    /// and hyphens.
    #[error("slug contains {character:?}; only lowercase letters, digits, and hyphens are allowed")]
    InvalidCharacter {
        /// First offending character.
        character: char,
    },
    /// A hyphen leads, trails, or neighbours another hyphen.
    #[error("hyphens must separate non-empty alphanumeric segments")]
    HyphenPlacement,
}

/// Check a slug against the format grammar.
///
/// # Errors
///
/// Returns the first [`SlugFormatViolation`] encountered: emptiness, then
/// length bounds, then character set, then hyphen placement.
///
/// # Examples
///
/// ```
/// assert!(slugtext::validate("dr-jane-smith-dubai").is_ok());
/// assert!(slugtext::validate("Dr-Jane").is_err());
/// assert!(slugtext::validate("-leading").is_err());
/// ```
pub fn validate(slug: &str) -> Result<(), SlugFormatViolation> {
    if slug.is_empty() {
        return Err(SlugFormatViolation::Empty);
    }

    let length = slug.chars().count();
    if length < MIN_LENGTH {
        return Err(SlugFormatViolation::TooShort { length });
    }
    if length > MAX_LENGTH {
        return Err(SlugFormatViolation::TooLong { length });
    }

    for ch in slug.chars() {
        match ch {
            'a'..='z' | '0'..='9' | '-' => {}
            character => return Err(SlugFormatViolation::InvalidCharacter { character }),
        }
    }

    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(SlugFormatViolation::HyphenPlacement);
    }

    Ok(())
}

/// Convenience predicate over [`validate`].
#[must_use]
pub fn is_valid(slug: &str) -> bool {
    validate(slug).is_ok()
}
