//! Customer journey: browse, add to cart, checkout, payment hand-off

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::spec::{TestSpec, TestStep, WaitState};

pub const NAME: &str = "customer-journey";
pub const HOME_TITLE: &str = "Makhaana - Premium Fox Nuts | Healthy Snacks";
pub const PRODUCT_NAME: &str = "Premium Makhaana";
pub const PRODUCT_PATH: &str = "/product/premium-makhaana";
/// Waited for as `attached` rather than Playwright's default `visible`:
/// the provider mounts the frame before painting it, and presence is what
/// marks the hand-off.
pub const PAYMENT_IFRAME: &str = "iframe.razorpay-checkout-frame";

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PINCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").unwrap());

/// Checkout form contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl Default for ShippingDetails {
    fn default() -> Self {
        Self {
            full_name: "Test User".to_string(),
            phone: "9876543210".to_string(),
            email: "testuser@example.com".to_string(),
            address_line1: "123 Testing Ave".to_string(),
            address_line2: None,
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "400001".to_string(),
        }
    }
}

impl ShippingDetails {
    /// `(input name, value)` pairs in form order
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("fullName", self.full_name.as_str()),
            ("phone", self.phone.as_str()),
            ("email", self.email.as_str()),
            ("addressLine1", self.address_line1.as_str()),
        ];
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.is_empty()) {
            fields.push(("addressLine2", line2));
        }
        fields.extend([
            ("city", self.city.as_str()),
            ("state", self.state.as_str()),
            ("pincode", self.pincode.as_str()),
        ]);
        fields
    }

    /// Same rules the checkout form enforces before opening payment
    pub fn validate(&self) -> E2eResult<()> {
        for (name, value) in self.fields() {
            if value.is_empty() {
                return Err(invalid(format!("{} is required", name)));
            }
        }
        if !PHONE.is_match(&self.phone) {
            return Err(invalid(format!("phone must be 10 digits: {}", self.phone)));
        }
        if !EMAIL.is_match(&self.email) {
            return Err(invalid(format!("invalid email: {}", self.email)));
        }
        if !PINCODE.is_match(&self.pincode) {
            return Err(invalid(format!("pincode must be 6 digits: {}", self.pincode)));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> E2eError {
    E2eError::InvalidConfig(format!("shipping details: {}", reason))
}

pub fn customer_journey(config: &E2eConfig) -> TestSpec {
    build(config, &ShippingDetails::default())
}

/// Customer journey with a custom shipping record, validated up front
pub fn customer_journey_with(config: &E2eConfig, shipping: &ShippingDetails) -> E2eResult<TestSpec> {
    shipping.validate()?;
    Ok(build(config, shipping))
}

fn build(config: &E2eConfig, shipping: &ShippingDetails) -> TestSpec {
    let timeouts = &config.timeouts;
    let mut spec = TestSpec::new(NAME)
        .with_description("Customer buys Premium Makhaana up to the payment provider hand-off")
        .with_tags(&["customer", "checkout"])
        .step(TestStep::Navigate { url: "/".to_string() })
        .step(TestStep::ExpectTitle { title: HOME_TITLE.to_string(), timeout_ms: None })
        .step(TestStep::Click { locator: Locator::role("link", "Shop").exact().first() })
        .step(expect_url("/shop"))
        .step(TestStep::Click { locator: Locator::role("link", PRODUCT_NAME).first() })
        .step(expect_url(PRODUCT_PATH))
        .step(TestStep::WaitForSelector {
            selector: ".animate-spin".to_string(),
            state: WaitState::Hidden,
            timeout_ms: Some(timeouts.spinner_hidden_ms),
        })
        .step(TestStep::ExpectVisible {
            locator: Locator::role("button", "Add to Cart"),
            timeout_ms: None,
        })
        .step(TestStep::Click { locator: Locator::role("button", "Add to Cart") })
        .step(TestStep::ExpectVisible {
            locator: Locator::text("Added to cart!"),
            timeout_ms: None,
        })
        .step(TestStep::Click { locator: Locator::role("link", "Cart").first() })
        .step(expect_url("/cart"))
        .step(TestStep::Click { locator: Locator::role("link", "Checkout") })
        .step(expect_url("/checkout"));

    for (name, value) in shipping.fields() {
        spec.steps.push(TestStep::Fill {
            locator: Locator::css(format!(r#"input[name="{}"]"#, name)),
            value: value.to_string(),
        });
    }

    spec.step(TestStep::Click { locator: Locator::role("button", "Proceed to Payment") })
        .step(TestStep::WaitForSelector {
            selector: PAYMENT_IFRAME.to_string(),
            state: WaitState::Attached,
            timeout_ms: Some(timeouts.payment_iframe_ms),
        })
        .step(TestStep::ExpectCount {
            locator: Locator::css(PAYMENT_IFRAME),
            count: 1,
            timeout_ms: None,
        })
}

fn expect_url(path: &str) -> TestStep {
    TestStep::ExpectUrl { path: path.to_string(), timeout_ms: None }
}
