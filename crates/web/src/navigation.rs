//! Navigation menu filtered by the same predicate the gate uses.
//!
//! Presentational only: hiding a link never replaces the gate check on the screen.

use serde::Serialize;

use indica_auth::{AccessGate, AccessRequirement, AuthSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub path: &'static str,
    pub requirement: AccessRequirement,
}

impl NavLink {
    pub const fn new(label: &'static str, path: &'static str, requirement: AccessRequirement) -> Self {
        Self {
            label,
            path,
            requirement,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigationPresenter {
    gate: AccessGate,
    links: Vec<NavLink>,
}

impl NavigationPresenter {
    pub fn new(gate: AccessGate, links: Vec<NavLink>) -> Self {
        Self { gate, links }
    }

    /// Menu of the referral application.
    pub fn application(gate: AccessGate) -> Self {
        use AccessRequirement::{Authenticated, Public};

        Self::new(
            gate,
            vec![
                NavLink::new("Início", "/", Public),
                NavLink::new("Como Funciona", "/como-funciona", Public),
                NavLink::new("Sobre o Aplicativo", "/sobre-aplicativo", Public),
                NavLink::new("FAQ", "/faq", Public),
                NavLink::new("Painel", "/dashboard", Authenticated),
                NavLink::new("Indicar Imóvel", "/indicar", Authenticated),
                NavLink::new("Comissões", "/comissoes", Authenticated),
                NavLink::new("Chave Pix", "/cadastrar-pix", Authenticated),
                NavLink::new("Administração", "/admin", AccessRequirement::ADMIN),
                NavLink::new("Usuários", "/admin/usuarios", AccessRequirement::ADMIN),
                NavLink::new("Gestão de Imóveis", "/gestao-imoveis", AccessRequirement::ADMIN),
                NavLink::new("Financeiro", "/financeiro", AccessRequirement::FINANCE),
                NavLink::new("Comercial", "/comercial", AccessRequirement::COMMERCIAL),
            ],
        )
    }

    pub fn links(&self) -> &[NavLink] {
        &self.links
    }

    /// Links the gate would allow right now. Pending decisions hide the link.
    pub fn visible(&self, snapshot: &AuthSnapshot) -> Vec<&NavLink> {
        self.links
            .iter()
            .filter(|link| {
                self.gate
                    .decide(snapshot, &link.requirement, link.path)
                    .is_allowed()
            })
            .collect()
    }
}
