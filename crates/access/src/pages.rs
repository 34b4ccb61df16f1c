//! Static page registration: descriptors and capability predicates.
//!
//! Registration is configuration, not runtime state; changing the page set
//! means redeploying the client. Looking up an unregistered page id is a
//! [`ConfigurationError`].

use std::collections::HashMap;

use peopleops_auth::{CapabilitySet, CapabilityToken, Scope};
use peopleops_core::{ConfigurationError, PageId};

// ─────────────────────────────────────────────────────────────────────────────
// Predicates
// ─────────────────────────────────────────────────────────────────────────────

/// Boolean composition over capability tokens.
///
/// Evaluated against the principal's aggregate set with scope-widened
/// matching — a local, optimistic check; resource-scoped truth stays with
/// the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityPredicate {
    /// Satisfied by any principal, including one with an empty set.
    Always,
    Token(CapabilityToken),
    AllOf(Vec<CapabilityPredicate>),
    AnyOf(Vec<CapabilityPredicate>),
}

impl CapabilityPredicate {
    pub fn token(token: CapabilityToken) -> Self {
        Self::Token(token)
    }

    pub fn all_of(predicates: impl IntoIterator<Item = CapabilityPredicate>) -> Self {
        Self::AllOf(predicates.into_iter().collect())
    }

    pub fn any_of(predicates: impl IntoIterator<Item = CapabilityPredicate>) -> Self {
        Self::AnyOf(predicates.into_iter().collect())
    }

    pub fn eval(&self, capabilities: &CapabilitySet) -> bool {
        match self {
            CapabilityPredicate::Always => true,
            CapabilityPredicate::Token(token) => capabilities.satisfies(token),
            CapabilityPredicate::AllOf(preds) => preds.iter().all(|p| p.eval(capabilities)),
            CapabilityPredicate::AnyOf(preds) => preds.iter().any(|p| p.eval(capabilities)),
        }
    }

    /// Every token mentioned anywhere in the predicate, for diagnostics
    /// (the "what would have satisfied this" list on local denials).
    pub fn tokens(&self) -> Vec<&CapabilityToken> {
        match self {
            CapabilityPredicate::Always => Vec::new(),
            CapabilityPredicate::Token(token) => vec![token],
            CapabilityPredicate::AllOf(preds) | CapabilityPredicate::AnyOf(preds) => {
                preds.iter().flat_map(|p| p.tokens()).collect()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PageDescriptor / PageRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// A registered UI surface.
#[derive(Debug, Clone)]
pub struct PageDescriptor {
    pub id: PageId,
    /// Navigation label.
    pub label: String,
    /// Icon name for the navigation menu.
    pub icon: String,
    /// Position within the navigation menu (ascending).
    pub nav_order: u32,
    /// Rank in the default-landing-page ordering (ascending); `None` means
    /// the page is never a home candidate.
    pub home_priority: Option<u32>,
    /// Whether checks against this page expect a resource id.
    pub resource_scoped: bool,
    pub predicate: CapabilityPredicate,
}

/// Static lookup table of page descriptors, in navigation order.
#[derive(Debug, Default)]
pub struct PageRegistry {
    pages: Vec<PageDescriptor>,
    index: HashMap<PageId, usize>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: PageDescriptor) -> Result<(), ConfigurationError> {
        if self.index.contains_key(&descriptor.id) {
            return Err(ConfigurationError::duplicate_page(descriptor.id.as_str()));
        }
        self.index.insert(descriptor.id.clone(), self.pages.len());
        self.pages.push(descriptor);
        Ok(())
    }

    pub fn get(&self, page: &PageId) -> Result<&PageDescriptor, ConfigurationError> {
        self.index
            .get(page)
            .map(|&i| &self.pages[i])
            .ok_or_else(|| ConfigurationError::unknown_page(page.as_str()))
    }

    /// All descriptors in navigation order.
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default HR registry
// ─────────────────────────────────────────────────────────────────────────────

fn read(resource: &str) -> CapabilityPredicate {
    CapabilityPredicate::token(CapabilityToken::new(resource, "read"))
}

/// The HR application's page set.
///
/// `profile` is the universally-accessible fallback: every authenticated
/// principal can reach it regardless of capabilities.
pub fn default_registry() -> PageRegistry {
    let mut registry = PageRegistry::new();

    let pages = [
        PageDescriptor {
            id: PageId::from("dashboard"),
            label: "Dashboard".to_string(),
            icon: "home".to_string(),
            nav_order: 0,
            home_priority: Some(0),
            resource_scoped: false,
            predicate: read("dashboard"),
        },
        PageDescriptor {
            id: PageId::from("employees/list"),
            label: "Employees".to_string(),
            icon: "people".to_string(),
            nav_order: 10,
            home_priority: Some(10),
            resource_scoped: false,
            predicate: read("employee"),
        },
        PageDescriptor {
            id: PageId::from("employees/detail"),
            label: "Employee".to_string(),
            icon: "person".to_string(),
            nav_order: 11,
            home_priority: None,
            resource_scoped: true,
            predicate: read("employee"),
        },
        PageDescriptor {
            id: PageId::from("employees/edit"),
            label: "Edit Employee".to_string(),
            icon: "edit".to_string(),
            nav_order: 12,
            home_priority: None,
            resource_scoped: true,
            predicate: CapabilityPredicate::token(CapabilityToken::new("employee", "edit")),
        },
        PageDescriptor {
            id: PageId::from("departments"),
            label: "Departments".to_string(),
            icon: "apartment".to_string(),
            nav_order: 20,
            home_priority: Some(20),
            resource_scoped: false,
            predicate: read("department"),
        },
        PageDescriptor {
            id: PageId::from("leave/requests"),
            label: "Leave Requests".to_string(),
            icon: "event".to_string(),
            nav_order: 30,
            home_priority: Some(30),
            resource_scoped: false,
            predicate: CapabilityPredicate::any_of([
                read("leave"),
                CapabilityPredicate::token(CapabilityToken::new("leave", "create")),
            ]),
        },
        PageDescriptor {
            id: PageId::from("leave/approvals"),
            label: "Leave Approvals".to_string(),
            icon: "check".to_string(),
            nav_order: 31,
            home_priority: None,
            resource_scoped: true,
            predicate: CapabilityPredicate::token(CapabilityToken::with_scope(
                "leave",
                "approve",
                Scope::Supervised,
            )),
        },
        PageDescriptor {
            id: PageId::from("payroll"),
            label: "Payroll".to_string(),
            icon: "payments".to_string(),
            nav_order: 40,
            home_priority: None,
            resource_scoped: true,
            predicate: read("payroll"),
        },
        PageDescriptor {
            id: PageId::from("admin/users"),
            label: "User Administration".to_string(),
            icon: "admin".to_string(),
            nav_order: 50,
            home_priority: None,
            resource_scoped: false,
            predicate: CapabilityPredicate::all_of([
                read("user"),
                CapabilityPredicate::token(CapabilityToken::new("user", "manage")),
            ]),
        },
        PageDescriptor {
            id: PageId::from("profile"),
            label: "My Profile".to_string(),
            icon: "account".to_string(),
            nav_order: 60,
            home_priority: Some(100),
            resource_scoped: false,
            predicate: CapabilityPredicate::Always,
        },
    ];

    for page in pages {
        // Ids above are literals; a duplicate is a defect in this function.
        if let Err(err) = registry.register(page) {
            tracing::error!("default page registry misconfigured: {err}");
        }
    }

    registry
}
