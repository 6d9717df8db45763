//! Element locators, rendered as Playwright locator expressions

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an element is resolved on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum By {
    /// CSS (or Playwright pseudo-CSS such as `:has-text`) selector
    Css { selector: String },

    /// Input by its placeholder text
    Placeholder { text: String },

    /// ARIA role with an optional accessible name
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        exact: bool,
    },

    /// Visible text content
    Text { text: String },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A locator plus an optional index into its matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    pub by: By,

    /// Zero-based match index; `0` renders as `.first()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_by(By::Css { selector: selector.into() })
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::from_by(By::Placeholder { text: text.into() })
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_by(By::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_by(By::Text { text: text.into() })
    }

    fn from_by(by: By) -> Self {
        Self { by, nth: None }
    }

    /// Require an exact accessible-name match. No-op for non-role locators.
    pub fn exact(mut self) -> Self {
        if let By::Role { exact, .. } = &mut self.by {
            *exact = true;
        }
        self
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Render as a JavaScript expression rooted at `page`
    pub fn to_js(&self) -> String {
        let base = match &self.by {
            By::Css { selector } => format!("page.locator({})", js_str(selector)),
            By::Placeholder { text } => format!("page.getByPlaceholder({})", js_str(text)),
            By::Role { role, name, exact } => {
                let mut opts = Vec::new();
                if let Some(name) = name {
                    opts.push(format!("name: {}", js_str(name)));
                }
                if *exact {
                    opts.push("exact: true".to_string());
                }
                if opts.is_empty() {
                    format!("page.getByRole({})", js_str(role))
                } else {
                    format!("page.getByRole({}, {{ {} }})", js_str(role), opts.join(", "))
                }
            }
            By::Text { text } => format!("page.getByText({})", js_str(text)),
        };

        match self.nth {
            None => base,
            Some(0) => format!("{}.first()", base),
            Some(i) => format!("{}.nth({})", base, i),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.by {
            By::Css { selector } => write!(f, "css={}", selector)?,
            By::Placeholder { text } => write!(f, "placeholder={:?}", text)?,
            By::Role { role, name, exact } => {
                write!(f, "role={}", role)?;
                if let Some(name) = name {
                    write!(f, "[name={:?}{}]", name, if *exact { " exact" } else { "" })?;
                }
            }
            By::Text { text } => write!(f, "text={:?}", text)?,
        }
        if let Some(i) = self.nth {
            write!(f, " >> nth={}", i)?;
        }
        Ok(())
    }
}

/// Quote a string as a JavaScript literal
pub fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
