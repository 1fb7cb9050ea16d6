use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
}

pub const NAV_LINKS: [NavLink; 3] = [
    NavLink {
        href: "index.html",
        label: "Classes",
    },
    NavLink {
        href: "resources.html",
        label: "Resources",
    },
    NavLink {
        href: "progress.html",
        label: "Progress",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub link: NavLink,
    pub active: bool,
}

/// Last path segment of the request, `index.html` for the site root.
pub fn current_page(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => "index.html",
    }
}

pub fn active_nav(path: &str, links: &[NavLink]) -> Vec<NavItem> {
    let current = current_page(path);
    links
        .iter()
        .map(|link| NavItem {
            link: *link,
            active: link.href == current,
        })
        .collect()
}

/// Mobile menu state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavToggle {
    open: bool,
}

impl NavToggle {
    pub fn is_open(self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    /// Following a link always closes the menu.
    pub fn link_clicked(&mut self) {
        self.open = false;
    }

    pub fn aria_expanded(self) -> &'static str {
        if self.open { "true" } else { "false" }
    }
}
