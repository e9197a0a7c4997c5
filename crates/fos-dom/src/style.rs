//! Inline Style Declarations
//!
//! The `style` attribute of an element as an ordered property list.

/// Inline style declaration block (`element.style`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDeclaration {
    properties: Vec<(String, String)>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any existing value in place
    pub fn set_property(&mut self, name: &str, value: &str) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.properties.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        let index = self.properties.iter().position(|(n, _)| n == name)?;
        Some(self.properties.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Serialize as `cssText`
    pub fn css_text(&self) -> String {
        self.properties
            .iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_replace() {
        let mut style = StyleDeclaration::new();
        style.set_property("transition", "opacity 0.5s");
        style.set_property("opacity", "0");
        style.set_property("opacity", "1");

        assert_eq!(style.len(), 2);
        assert_eq!(style.get_property_value("opacity"), Some("1"));
        assert_eq!(style.css_text(), "transition: opacity 0.5s; opacity: 1;");
    }

    #[test]
    fn test_remove_property() {
        let mut style = StyleDeclaration::new();
        style.set_property("opacity", "0");
        assert_eq!(style.remove_property("opacity"), Some("0".to_string()));
        assert!(style.is_empty());
    }
}
