//! Best-effort selector matching.
//!
//! Registry lookups support a deliberately small selector subset: an
//! optional tag, an optional `#id`, and any number of `.class` parts.
//! This is not general CSS — combinators, attributes, and pseudo-classes
//! are out of scope.

use crate::ElementInfo;

/// A parsed simple selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Selector {
    /// Parses `tag#id.class1.class2` in any order of `#`/`.` parts after
    /// the optional leading tag.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut selector = Self::default();
        let mut rest = input.trim();

        let tag_end = rest
            .find(|c| c == '#' || c == '.')
            .unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(rest[..tag_end].to_string());
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            let body = &rest[1..];
            let end = body
                .find(|c| c == '#' || c == '.')
                .unwrap_or(body.len());
            let part = &body[..end];
            if !part.is_empty() {
                match marker {
                    b'#' => selector.id = Some(part.to_string()),
                    b'.' => selector.classes.push(part.to_string()),
                    _ => {}
                }
            }
            rest = &body[end..];
        }

        selector
    }

    /// Whether an element matches this selector.
    ///
    /// Tag and id must match exactly when present. Class matching is
    /// fuzzy: at least half of the selector's classes must be present on
    /// the candidate.
    #[must_use]
    pub fn matches(&self, element: &ElementInfo) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.dom_id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let element_classes = element.classes();
            let present = self
                .classes
                .iter()
                .filter(|c| element_classes.contains(&c.as_str()))
                .count();
            // Integer math: present/total >= 1/2.
            if present * 2 < self.classes.len() {
                return false;
            }
        }
        true
    }
}
