#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemeStyle {
    pub color_from: String,
    pub color_to: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub items: Vec<String>,
    pub style: ThemeStyle,
}

impl Theme {
    pub fn new(name: &str, items: Vec<String>, style: ThemeStyle) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Theme {
            name: name.to_string(),
            items,
            style,
        })
    }

    pub fn generated(prompt: &str, items: Vec<String>) -> Option<Self> {
        Self::new(
            prompt.trim(),
            items,
            ThemeStyle {
                color_from: "from-violet-500".to_string(),
                color_to: "to-fuchsia-500".to_string(),
            },
        )
    }
}

const BUILTIN: [(&str, &str, &str, [&str; 18]); 3] = [
    (
        "Classic Fruits",
        "from-orange-400",
        "to-red-500",
        [
            "🍎", "🍌", "🍇", "🍊", "🍓", "🍉", "🍍", "🥝", "🍒", "🍑", "🥭", "🍋", "🍐", "🍏",
            "🥥", "🍅", "🥑", "🍆",
        ],
    ),
    (
        "Space Explorer",
        "from-indigo-500",
        "to-purple-600",
        [
            "🚀", "👨‍🚀", "🪐", "👽", "☄️", "🛰️", "🌑", "🔭", "🌍", "☀️", "🌟", "🛸", "🌌", "👾",
            "🤖", "🌠", "🎆", "🎇",
        ],
    ),
    (
        "Animals",
        "from-emerald-400",
        "to-teal-500",
        [
            "🐶", "🐱", "🦊", "🐻", "🐼", "🐨", "🦁", "🐯", "🐸", "🐵", "🐔", "🐧", "🐦", "🐤",
            "🦆", "🦅", "🦉", "🦇",
        ],
    ),
];

pub fn builtin_themes() -> Vec<Theme> {
    BUILTIN
        .iter()
        .map(|(name, from, to, items)| Theme {
            name: name.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
            style: ThemeStyle {
                color_from: from.to_string(),
                color_to: to.to_string(),
            },
        })
        .collect()
}

pub fn default_theme() -> Theme {
    let mut themes = builtin_themes();
    themes.swap_remove(0)
}

pub fn find_builtin(name: &str) -> Option<Theme> {
    let wanted = name.trim();
    builtin_themes()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(wanted))
}
