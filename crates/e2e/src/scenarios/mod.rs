//! Built-in storefront journeys

pub mod admin;
pub mod customer;

pub use admin::{admin_journey, admin_journey_with, AdminSection};
pub use customer::{customer_journey, customer_journey_with, ShippingDetails};

use crate::config::E2eConfig;
use crate::error::E2eResult;
use crate::spec::TestSpec;

/// Every built-in journey, admin first
pub fn builtin(config: &E2eConfig) -> Vec<TestSpec> {
    vec![admin_journey(config), customer_journey(config)]
}

/// The built-in journeys as a multi-document YAML stream
pub fn dump_yaml(config: &E2eConfig) -> E2eResult<String> {
    let mut out = String::new();
    for spec in builtin(config) {
        out.push_str("---\n");
        out.push_str(&spec.to_yaml()?);
    }
    Ok(out)
}

/// Look up a built-in journey by name (`admin`/`customer` also accepted)
pub fn by_name(config: &E2eConfig, name: &str) -> Option<TestSpec> {
    match name {
        admin::NAME | "admin" => Some(admin_journey(config)),
        customer::NAME | "customer" => Some(customer_journey(config)),
        _ => None,
    }
}
