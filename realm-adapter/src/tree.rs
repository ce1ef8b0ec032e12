//! The parsed element tree.
//!
//! Trees are immutable from the caller's point of view: every mutating
//! adapter method clones the tree and transforms the clone, so concurrent
//! readers of the original and later rollback remain valid. Nodes carry
//! the byte spans of their source text plus dirty bits; code generation
//! re-renders only dirty regions and leaves every other byte of the
//! original file untouched.

use realm_types::SourceSpan;
use std::collections::BTreeMap;

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A quoted string literal, stored without quotes.
    Literal(String),
    /// A brace-wrapped expression, stored without the outer braces.
    Expr(String),
    /// A bare boolean attribute (`<input disabled />`).
    Bare,
}

/// One attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// A text run between elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub text: String,
    pub span: SourceSpan,
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    /// An opaque `{expression}` child, kept verbatim.
    Expr(TextNode),
}

/// One parsed element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    /// Inline styles parsed out of a `style={{ ... }}` attribute.
    pub styles: BTreeMap<String, String>,
    /// Span of the whole element, `<` to closing `>`.
    pub span: SourceSpan,
    /// Span of the opening tag only.
    pub open_span: SourceSpan,
    /// Byte range of the children region (between the opening and closing
    /// tags). `None` for self-closing elements.
    pub inner_range: Option<(usize, usize)>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    /// Nearest enclosing named function/component.
    pub component: String,
    /// Structural path from the file root, e.g. `"App/div[0]/button[1]"`.
    pub ast_path: String,
    /// The opening tag must be re-rendered.
    pub dirty_open: bool,
    /// The children region must be re-rendered.
    pub dirty_inner: bool,
}

impl ElementNode {
    /// Direct text content, concatenated and trimmed. `None` when there
    /// are no text children.
    #[must_use]
    pub fn text_content(&self) -> Option<String> {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(&t.text);
            }
        }
        let trimmed = out.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// The attribute with the given name, if any.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Classes from the `className`/`class` attribute, split on
    /// whitespace. Only literal values are understood.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.attribute("className")
            .or_else(|| self.attribute("class"))
            .and_then(|a| match &a.value {
                AttrValue::Literal(s) => Some(s.split_whitespace().map(str::to_string).collect()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Whether the tag is a user-defined component (capitalized).
    #[must_use]
    pub fn is_component(&self) -> bool {
        self.tag.chars().next().is_some_and(|c| c.is_uppercase())
    }

    /// Depth-first walk over this element and its element descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementNode)) {
        visit(self);
        for child in &self.children {
            if let Node::Element(el) = child {
                el.walk(visit);
            }
        }
    }
}

/// A parsed source file: every JSX root found in it, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTree {
    pub file_path: String,
    pub roots: Vec<ElementNode>,
}

impl ElementTree {
    /// Depth-first walk over every element in the tree.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ElementNode)) {
        for root in &self.roots {
            root.walk(visit);
        }
    }

    /// Finds the element whose opening tag starts at the given position.
    #[must_use]
    pub fn find_at(&self, line: u32, column: u32) -> Option<&ElementNode> {
        let mut found = None;
        self.walk(&mut |el| {
            if found.is_none() && el.span.start.line == line && el.span.start.column == column {
                found = Some(el);
            }
        });
        found
    }

    /// Mutable lookup by opening-tag start position.
    pub fn find_at_mut(&mut self, line: u32, column: u32) -> Option<&mut ElementNode> {
        fn descend<'a>(
            node: &'a mut ElementNode,
            line: u32,
            column: u32,
        ) -> Option<&'a mut ElementNode> {
            if node.span.start.line == line && node.span.start.column == column {
                return Some(node);
            }
            for child in &mut node.children {
                if let Node::Element(el) = child {
                    if let Some(hit) = descend(el, line, column) {
                        return Some(hit);
                    }
                }
            }
            None
        }
        for root in &mut self.roots {
            if let Some(hit) = descend(root, line, column) {
                return Some(hit);
            }
        }
        None
    }

    /// Total number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }
}
