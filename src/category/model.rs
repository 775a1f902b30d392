use serde::Serialize;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// The fixed category set. Declaration order is the display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum CanonicalCategory {
    Teatro,
    Musica,
    Musical,
    Humor,
    Talk,
}

impl CanonicalCategory {
    pub const DEFAULT: CanonicalCategory = CanonicalCategory::Teatro;

    /// Exact, case-sensitive match on a canonical key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::from_str(key).ok()
    }

    pub fn key(&self) -> &'static str {
        self.into()
    }

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalCategory::Teatro => "Teatro",
            CanonicalCategory::Musica => "Música",
            CanonicalCategory::Musical => "Musical",
            CanonicalCategory::Humor => "Humor",
            CanonicalCategory::Talk => "Talk",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            CanonicalCategory::Teatro => "obx-cat--teatro",
            CanonicalCategory::Musica => "obx-cat--musica",
            CanonicalCategory::Musical => "obx-cat--musical",
            CanonicalCategory::Humor => "obx-cat--humor",
            CanonicalCategory::Talk => "obx-cat--talk",
        }
    }

    /// Color seeded on the matching manual taxonomy term.
    pub fn default_color(&self) -> &'static str {
        match self {
            CanonicalCategory::Teatro => "#009AD8",
            CanonicalCategory::Musica => "#7E57C2",
            CanonicalCategory::Musical => "#D14100",
            CanonicalCategory::Humor => "#2E7D32",
            CanonicalCategory::Talk => "#455A64",
        }
    }

    pub fn ordered() -> impl Iterator<Item = CanonicalCategory> {
        Self::iter()
    }
}

/// Category as shown on a card. Manual events may carry keys outside the canonical set,
/// those have an empty css class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCategory {
    pub key: String,
    pub label: String,
    pub css_class: String,
}

impl ResolvedCategory {
    pub fn canonical(&self) -> Option<CanonicalCategory> {
        CanonicalCategory::from_key(&self.key)
    }
}

impl From<CanonicalCategory> for ResolvedCategory {
    fn from(category: CanonicalCategory) -> Self {
        Self {
            key: category.key().to_string(),
            label: category.label().to_string(),
            css_class: category.css_class().to_string(),
        }
    }
}
