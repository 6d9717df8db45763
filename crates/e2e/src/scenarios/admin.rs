//! Admin journey: login, dashboard, then each management section

use crate::config::{Credentials, E2eConfig};
use crate::locator::Locator;
use crate::spec::{TestSpec, TestStep};

pub const NAME: &str = "admin-journey";

/// Sections reachable from the admin sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSection {
    Products,
    Orders,
    DeliveryRules,
    Messages,
}

impl AdminSection {
    pub const ALL: [AdminSection; 4] = [
        AdminSection::Products,
        AdminSection::Orders,
        AdminSection::DeliveryRules,
        AdminSection::Messages,
    ];

    /// Accessible name of the sidebar link
    pub fn link_name(&self) -> &'static str {
        match self {
            AdminSection::Products => "Products",
            AdminSection::Orders => "Orders",
            AdminSection::DeliveryRules => "Delivery Rules",
            AdminSection::Messages => "Messages",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            AdminSection::Products => "/admin/products",
            AdminSection::Orders => "/admin/orders",
            AdminSection::DeliveryRules => "/admin/delivery-rules",
            AdminSection::Messages => "/admin/messages",
        }
    }

    /// Headings that must be visible once the section has loaded
    pub fn headings(&self) -> &'static [&'static str] {
        match self {
            AdminSection::Products => &["Products", "Create New Product"],
            AdminSection::Orders => &["Orders"],
            AdminSection::DeliveryRules => &["Delivery Rules"],
            AdminSection::Messages => &["Contact Messages"],
        }
    }

    fn steps(&self) -> Vec<TestStep> {
        let mut steps = vec![
            TestStep::Click { locator: Locator::role("link", self.link_name()) },
            TestStep::ExpectUrl { path: self.path().to_string(), timeout_ms: None },
        ];
        steps.extend(self.headings().iter().map(|heading| TestStep::ExpectVisible {
            locator: Locator::role("heading", *heading),
            timeout_ms: None,
        }));
        steps
    }
}

/// Login with the configured admin and visit every section in sidebar order
pub fn admin_journey(config: &E2eConfig) -> TestSpec {
    admin_journey_with(config, &config.admin, &AdminSection::ALL)
}

pub fn admin_journey_with(
    config: &E2eConfig,
    credentials: &Credentials,
    sections: &[AdminSection],
) -> TestSpec {
    let mut spec = TestSpec::new(NAME)
        .with_description("Admin logs in and inspects dashboard, products, orders, delivery rules and messages")
        .with_tags(&["admin"])
        .step(TestStep::Navigate { url: "/auth".to_string() })
        .step(TestStep::Fill {
            locator: Locator::placeholder("Email address"),
            value: credentials.email.clone(),
        })
        .step(TestStep::Fill {
            locator: Locator::placeholder("Password"),
            value: credentials.password.clone(),
        })
        // The first "Login" button is the mode tab; the second submits.
        .step(TestStep::Click { locator: Locator::css(r#"button:has-text("Login")"#).nth(1) })
        .step(TestStep::ExpectUrl {
            path: "/admin".to_string(),
            timeout_ms: Some(config.timeouts.admin_redirect_ms),
        })
        .step(TestStep::ExpectVisible {
            locator: Locator::role("heading", "Dashboard"),
            timeout_ms: None,
        })
        .step(TestStep::ExpectVisible {
            locator: Locator::text("Total Orders"),
            timeout_ms: None,
        });

    for section in sections {
        spec.steps.extend(section.steps());
    }
    spec
}
