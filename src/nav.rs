//! Sidebar navigation
//!
//! [`NAV_ITEMS`] is the static menu tree. [`Sidebar`] adds the per-entry
//! `expanded` flags and turns clicks into collapse requests for the layout.

/// One entry of the navigation tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub icon: Option<&'static str>,
    pub route: Option<&'static str>,
    pub children: &'static [NavItem],
}

impl NavItem {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem {
        label: "Dashboard",
        icon: Some("bi bi-speedometer2"),
        route: Some("/dashboard"),
        children: &[],
    },
    NavItem {
        label: "Expenses",
        icon: Some("bi bi-wallet2"),
        route: Some("/expenses"),
        children: &[],
    },
    NavItem {
        label: "Settings",
        icon: Some("bi bi-gear"),
        route: Some("/settings"),
        children: &[
            NavItem {
                label: "Profile",
                icon: Some("bi bi-person"),
                route: Some("/settings/profile"),
                children: &[],
            },
            NavItem {
                label: "Budget",
                icon: Some("bi bi-piggy-bank"),
                route: Some("/settings/budget"),
                children: &[],
            },
        ],
    },
];

/// A top-level entry with its local expansion flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub item: NavItem,
    pub expanded: bool,
}

/// Sidebar state. Holds no session data; collapse changes are returned to
/// the caller, which owns the collapsed flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidebar {
    entries: Vec<SidebarEntry>,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self::new(NAV_ITEMS)
    }
}

impl Sidebar {
    pub fn new(items: &[NavItem]) -> Self {
        Self {
            entries: items
                .iter()
                .map(|item| SidebarEntry {
                    item: *item,
                    expanded: false,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SidebarEntry] {
        &self.entries
    }

    /// Flip one entry's expansion; other entries are untouched
    pub fn toggle_expand(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.expanded = !entry.expanded;
        }
    }

    /// Request the opposite collapse state and fold every entry
    pub fn toggle_collapse(&mut self, is_collapsed: bool) -> bool {
        for entry in &mut self.entries {
            entry.expanded = false;
        }
        !is_collapsed
    }

    /// Request a collapsed sidebar
    pub fn close(&self) -> bool {
        true
    }
}

/// Render the tree as indented text lines
pub fn render_tree(items: &[NavItem]) -> Vec<String> {
    fn walk(items: &[NavItem], depth: usize, out: &mut Vec<String>) {
        for item in items {
            let route = item.route.unwrap_or("-");
            out.push(format!("{}{:<12}{}", "  ".repeat(depth), item.label, route));
            walk(item.children, depth + 1, out);
        }
    }

    let mut lines = Vec::new();
    walk(items, 0, &mut lines);
    lines
}
