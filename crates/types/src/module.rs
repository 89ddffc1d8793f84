use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest identifier reserved for built-in demo modules.
///
/// Ids `1..=DEMO_ID_MAX` never come from the server: both storage backends
/// start allocating module ids at `DEMO_ID_MAX + 1`.
pub const DEMO_ID_MAX: i64 = 100;

/// Identifier of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct ModuleId(pub i64);

impl ModuleId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ModuleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A module reference whose origin has already been resolved.
///
/// The origin is decided once, when a catalog is loaded: entries that came
/// from the server are `Persisted`, entries from the built-in fallback
/// catalog are `Demo`. Install state for `Demo` modules is never sent to the
/// server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleRef {
    Demo(ModuleId),
    Persisted(ModuleId),
}

impl ModuleRef {
    pub fn id(self) -> ModuleId {
        match self {
            ModuleRef::Demo(id) | ModuleRef::Persisted(id) => id,
        }
    }

    pub fn is_demo(self) -> bool {
        matches!(self, ModuleRef::Demo(_))
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleRef::Demo(id) => write!(f, "demo:{}", id),
            ModuleRef::Persisted(id) => write!(f, "{}", id),
        }
    }
}

/// Module category. The set is closed; unknown names are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum Category {
    JavaScript,
    TypeScript,
    Python,
    #[serde(rename = "C++")]
    Cpp,
    C,
    Rust,
    R,
    Ruby,
    Solidity,
    Java,
    #[serde(rename = "C#")]
    CSharp,
    Go,
    React,
    #[serde(rename = "CSS")]
    Css,
    PyTorch,
    Tailwind,
    #[serde(rename = "Node.js")]
    NodeJs,
    Express,
    Matplotlib,
    #[serde(rename = "HTML")]
    Html,
    Utility,
    Other,
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::JavaScript,
        Category::TypeScript,
        Category::Python,
        Category::Cpp,
        Category::C,
        Category::Rust,
        Category::R,
        Category::Ruby,
        Category::Solidity,
        Category::Java,
        Category::CSharp,
        Category::Go,
        Category::React,
        Category::Css,
        Category::PyTorch,
        Category::Tailwind,
        Category::NodeJs,
        Category::Express,
        Category::Matplotlib,
        Category::Html,
        Category::Utility,
        Category::Other,
    ];

    /// Name as stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::JavaScript => "JavaScript",
            Category::TypeScript => "TypeScript",
            Category::Python => "Python",
            Category::Cpp => "C++",
            Category::C => "C",
            Category::Rust => "Rust",
            Category::R => "R",
            Category::Ruby => "Ruby",
            Category::Solidity => "Solidity",
            Category::Java => "Java",
            Category::CSharp => "C#",
            Category::Go => "Go",
            Category::React => "React",
            Category::Css => "CSS",
            Category::PyTorch => "PyTorch",
            Category::Tailwind => "Tailwind",
            Category::NodeJs => "Node.js",
            Category::Express => "Express",
            Category::Matplotlib => "Matplotlib",
            Category::Html => "HTML",
            Category::Utility => "Utility",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown module category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// An installable code-snippet package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub downloads: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Module {
    /// Case-insensitive match against name, description and tags.
    pub fn matches_text(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&term))
    }
}

/// Payload for creating a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewModule {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of a module; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ModuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ModuleUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.content.is_none()
            && self.tags.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("Cobol".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_with_display_name() {
        let json = serde_json::to_string(&Category::NodeJs).unwrap();
        assert_eq!(json, "\"Node.js\"");
        let parsed: Category = serde_json::from_str("\"C#\"").unwrap();
        assert_eq!(parsed, Category::CSharp);
    }

    #[test]
    fn test_module_ref_reports_origin() {
        let demo = ModuleRef::Demo(ModuleId(3));
        let real = ModuleRef::Persisted(ModuleId(101));
        assert!(demo.is_demo());
        assert!(!real.is_demo());
        assert_eq!(demo.id(), ModuleId(3));
        assert_eq!(real.to_string(), "101");
    }

    #[test]
    fn test_module_wire_shape_is_camel_case() {
        let json = r#"{
            "id": 101,
            "name": "CSS Grid Templates",
            "description": "Grid layouts",
            "category": "CSS",
            "content": ".grid {}",
            "tags": ["css", "grid"],
            "downloads": 5,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }"#;
        let module: Module = serde_json::from_str(json).unwrap();
        assert_eq!(module.id, ModuleId(101));
        assert_eq!(module.category, Category::Css);
        assert!(module.matches_text("GRID"));
        assert!(!module.matches_text("flexbox"));
    }
}
