//! Data-driven route table.
//!
//! Routes are matched in declaration order; the first pattern that fits wins.
//! Patterns are `/`-separated literals, `:name` captures one segment, and a
//! trailing `*` matches the rest (including nothing).

use crate::db::UserRole;

use super::auth_entry::AuthView;
use super::guard::RouteRequirement;

#[derive(Debug, Clone)]
pub struct RouteRecord<C> {
    pub pattern: String,
    pub requirement: RouteRequirement,
    pub component: C,
}

#[derive(Debug, Clone)]
pub struct RouteMatch<'a, C> {
    pub record: &'a RouteRecord<C>,
    pub params: Vec<(String, String)>,
}

impl<C> RouteMatch<'_, C> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable<C> {
    records: Vec<RouteRecord<C>>,
}

impl<C> Default for RouteTable<C> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<C> RouteTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, requirement: RouteRequirement, component: C) -> Self {
        self.records.push(RouteRecord {
            pattern: pattern.to_string(),
            requirement,
            component,
        });
        self
    }

    pub fn records(&self) -> &[RouteRecord<C>] {
        &self.records
    }

    pub fn resolve(&self, pathname: &str) -> Option<RouteMatch<'_, C>> {
        self.records.iter().find_map(|record| {
            match_pattern(&record.pattern, pathname).map(|params| RouteMatch { record, params })
        })
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_pattern(pattern: &str, pathname: &str) -> Option<Vec<(String, String)>> {
    let pathname = pathname.split(['?', '#']).next().unwrap_or("");
    let mut path = segments(pathname);
    let mut params = Vec::new();

    for part in segments(pattern) {
        if part == "*" {
            return Some(params);
        }
        let actual = path.next()?;
        if let Some(name) = part.strip_prefix(':') {
            params.push((name.to_string(), actual.to_string()));
        } else if part != actual {
            return None;
        }
    }

    if path.next().is_some() {
        return None;
    }
    Some(params)
}

/// Pages of the storefront client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Products,
    ProductDetail,
    Cart,
    Checkout,
    Orders,
    OrderDetail,
    Profile,
    AdminDashboard,
    AdminProducts,
    AdminOrders,
    /// Login/register entry point; opens the auth overlay instead of rendering.
    AuthEntry(AuthView),
    VerifyEmail,
    NotFound,
}

/// The storefront's route table.
pub fn storefront_routes() -> RouteTable<Page> {
    use RouteRequirement::*;

    RouteTable::new()
        .route("/", Open, Page::Home)
        .route("/products", Open, Page::Products)
        .route("/products/:id", Open, Page::ProductDetail)
        .route("/cart", Open, Page::Cart)
        .route("/checkout", Authenticated, Page::Checkout)
        .route("/orders", Authenticated, Page::Orders)
        .route("/orders/:id", Authenticated, Page::OrderDetail)
        .route("/profile", Authenticated, Page::Profile)
        .route("/admin", Role(UserRole::Admin), Page::AdminDashboard)
        .route("/admin/products", Role(UserRole::Admin), Page::AdminProducts)
        .route("/admin/orders", Role(UserRole::Admin), Page::AdminOrders)
        .route("/login", PublicOnly, Page::AuthEntry(AuthView::Login))
        .route("/register", PublicOnly, Page::AuthEntry(AuthView::Register))
        .route("/verify-email/:token", Open, Page::VerifyEmail)
        .route("*", Open, Page::NotFound)
}
