//! Supported locales and URL locale-prefix handling.
//!
//! Every route served by SidraOS carries a leading locale segment
//! (`/ar/...` or `/en/...`). The guard strips that segment before route
//! classification and redirects unprefixed paths to their default-locale
//! equivalent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text direction for a locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

/// Supported language tags. Exactly one default exists (`en`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ar,
    #[default]
    En,
}

/// All supported locales, in display order.
pub const LOCALES: [Locale; 2] = [Locale::Ar, Locale::En];

impl Locale {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Human-readable name, in the language itself.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Ar => "العربية",
            Self::En => "English",
        }
    }

    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Ar => Direction::Rtl,
            Self::En => Direction::Ltr,
        }
    }

    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self.direction(), Direction::Rtl)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ar" => Ok(Self::Ar),
            "en" => Ok(Self::En),
            _ => Err(UnknownLocale),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownLocale;

impl fmt::Display for UnknownLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown locale")
    }
}

impl std::error::Error for UnknownLocale {}

/// Split a request path into its locale prefix and the remaining path.
///
/// `/en/overview` yields `(Some(En), "/overview")`; a path without a valid
/// two-letter prefix yields `(None, path)` untouched. The remainder always
/// keeps its leading slash (`/en` alone yields `(Some(En), "/")`).
#[must_use]
pub fn split_locale(path: &str) -> (Option<Locale>, &str) {
    let Some(rest) = path.strip_prefix('/') else {
        return (None, path);
    };

    let segment = rest.split('/').next().unwrap_or("");
    let Ok(locale) = segment.parse::<Locale>() else {
        return (None, path);
    };

    let remainder = &rest[segment.len()..];
    if remainder.is_empty() {
        (Some(locale), "/")
    } else {
        (Some(locale), remainder)
    }
}

/// Locale used for redirect targets when a path carries no valid prefix.
///
/// Mirrors request matching on the guard side: anything that does not start
/// with `/ar` resolves to the default locale.
#[must_use]
pub fn locale_of_path(path: &str) -> Locale {
    split_locale(path).0.unwrap_or_default()
}
