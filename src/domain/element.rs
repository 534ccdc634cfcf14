use std::collections::HashMap;

/// Evaluation context for one element matched by a structural watch:
/// the element's text content plus its attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchedElement {
    pub text: String,
    pub attrs: HashMap<String, String>,
}

impl MatchedElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Attribute value, or `""` when the attribute is absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attrs.get(name).map(String::as_str).unwrap_or("")
    }
}
