//! Fixed category and color catalogs.
//!
//! Both catalogs are plain `static` tables: built at compile time, never
//! mutated, readable from any thread. Lookups by an unknown id resolve to the
//! catalog's `"default"` entry instead of failing.

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

pub const DEFAULT_CATEGORY_ID: &str = "default";
pub const DEFAULT_COLOR_ID: &str = "default";

/// Navigation-only pseudo category selecting notes created in the last 24h.
pub const RECENT_CATEGORY_ID: &str = "recent";

/// Display swatch shared by categories and note colors.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Swatch {
    Clear,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Gray,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub swatch: Swatch,
}

impl Category {
    pub fn is_pseudo(&self) -> bool {
        self.id == RECENT_CATEGORY_ID
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorOption {
    pub id: &'static str,
    pub name: &'static str,
    pub swatch: Swatch,
}

pub static CATEGORIES: [Category; 7] = [
    Category { id: RECENT_CATEGORY_ID, name: "Recent", icon: "📝", swatch: Swatch::Blue },
    Category { id: "work", name: "Work", icon: "💼", swatch: Swatch::Blue },
    Category { id: "personal", name: "Personal", icon: "👤", swatch: Swatch::Green },
    Category { id: "ideas", name: "Ideas", icon: "💡", swatch: Swatch::Yellow },
    Category { id: "tasks", name: "Tasks", icon: "✅", swatch: Swatch::Orange },
    Category { id: "study", name: "Study", icon: "📚", swatch: Swatch::Purple },
    Category { id: DEFAULT_CATEGORY_ID, name: "General", icon: "📄", swatch: Swatch::Gray },
];

pub static COLORS: [ColorOption; 9] = [
    ColorOption { id: DEFAULT_COLOR_ID, name: "Default", swatch: Swatch::Clear },
    ColorOption { id: "red", name: "Red", swatch: Swatch::Red },
    ColorOption { id: "orange", name: "Orange", swatch: Swatch::Orange },
    ColorOption { id: "yellow", name: "Yellow", swatch: Swatch::Yellow },
    ColorOption { id: "green", name: "Green", swatch: Swatch::Green },
    ColorOption { id: "blue", name: "Blue", swatch: Swatch::Blue },
    ColorOption { id: "purple", name: "Purple", swatch: Swatch::Purple },
    ColorOption { id: "pink", name: "Pink", swatch: Swatch::Pink },
    ColorOption { id: "gray", name: "Gray", swatch: Swatch::Gray },
];

/// Exact lookup; `None` for ids outside the catalog.
pub fn find_category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// Lookup with fallback to the "General" entry.
pub fn category(id: &str) -> &'static Category {
    find_category(id).unwrap_or_else(default_category)
}

pub fn default_category() -> &'static Category {
    // The default entry is last in the table.
    &CATEGORIES[CATEGORIES.len() - 1]
}

/// Categories offered by create/edit pickers (everything except "recent").
pub fn pickable_categories() -> impl Iterator<Item = &'static Category> {
    CATEGORIES.iter().filter(|c| !c.is_pseudo())
}

pub fn find_color(id: &str) -> Option<&'static ColorOption> {
    COLORS.iter().find(|c| c.id == id)
}

/// Absent color ids and unknown ids both resolve to the default color.
pub fn color(id: Option<&str>) -> &'static ColorOption {
    id.and_then(find_color).unwrap_or(&COLORS[0])
}

pub fn all_colors() -> &'static [ColorOption] {
    &COLORS
}
