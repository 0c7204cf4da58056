//! Route table: path patterns to screens, each declaring its access requirement.

use serde::Serialize;

use indica_auth::AccessRequirement;

/// A screen as composed into the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub name: &'static str,
    /// Literal segments and `:param` placeholders, e.g. `/editar-indicacao/:id`.
    pub pattern: &'static str,
    pub requirement: AccessRequirement,
}

impl Screen {
    pub const fn new(name: &'static str, pattern: &'static str, requirement: AccessRequirement) -> Self {
        Self {
            name,
            pattern,
            requirement,
        }
    }

    fn matches(&self, path: &str) -> Option<Vec<(&'static str, String)>> {
        let mut pattern = segments(self.pattern);
        let mut actual = segments(path);
        let mut params = Vec::new();

        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(p), Some(a)) => match p.strip_prefix(':') {
                    Some(name) => params.push((name, a.to_string())),
                    None if p == a => {}
                    None => return None,
                },
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The screen a path resolved to, with any captured `:param` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub screen: &'a Screen,
    pub params: Vec<(&'static str, String)>,
}

impl RouteMatch<'_> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Ordered screens plus a fallback for unknown paths. First match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    screens: Vec<Screen>,
    fallback: Screen,
}

impl RouteTable {
    pub fn new(fallback: Screen) -> Self {
        Self {
            screens: Vec::new(),
            fallback,
        }
    }

    pub fn with(mut self, screen: Screen) -> Self {
        self.screens.push(screen);
        self
    }

    /// The referral application's screens.
    pub fn application() -> Self {
        use AccessRequirement::{Authenticated, Public};

        Self::new(Screen::new("not_found", "*", Public))
            .with(Screen::new("landing", "/", Public))
            .with(Screen::new("auth", "/auth", Public))
            .with(Screen::new("faq", "/faq", Public))
            .with(Screen::new("how_it_works", "/como-funciona", Public))
            .with(Screen::new("about", "/sobre-aplicativo", Public))
            .with(Screen::new("dashboard", "/dashboard", Authenticated))
            .with(Screen::new("refer", "/indicar", Authenticated))
            .with(Screen::new("commissions", "/comissoes", Authenticated))
            .with(Screen::new("edit_referral", "/editar-indicacao/:id", Authenticated))
            .with(Screen::new("payout_key", "/cadastrar-pix", Authenticated))
            .with(Screen::new("admin", "/admin", AccessRequirement::ADMIN))
            .with(Screen::new("admin_users", "/admin/usuarios", AccessRequirement::ADMIN))
            .with(Screen::new("property_management", "/gestao-imoveis", AccessRequirement::ADMIN))
            .with(Screen::new("finance", "/financeiro", AccessRequirement::FINANCE))
            .with(Screen::new("commercial", "/comercial", AccessRequirement::COMMERCIAL))
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn fallback(&self) -> &Screen {
        &self.fallback
    }

    /// Resolve a requested location. Query string and fragment are ignored.
    pub fn resolve(&self, location: &str) -> RouteMatch<'_> {
        let path = route_path(location);
        self.screens
            .iter()
            .find_map(|screen| {
                screen
                    .matches(path)
                    .map(|params| RouteMatch { screen, params })
            })
            .unwrap_or(RouteMatch {
                screen: &self.fallback,
                params: Vec::new(),
            })
    }
}

/// Path part of a location (`/a/b?x=1#top` → `/a/b`).
pub fn route_path(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    &location[..end]
}
