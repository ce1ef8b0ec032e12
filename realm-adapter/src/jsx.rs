//! Reference adapter for JSX/TSX-like markup.
//!
//! The parser is a single-pass cursor over the file's bytes. It does not
//! understand JavaScript; it scans for JSX roots (a `<` in expression
//! position), parses each element tree, and treats `{ ... }` expressions
//! as opaque balanced-brace regions. Component names come from the
//! nearest preceding `function Name` / `const Name =` declaration.
//!
//! All mutators clone the tree and transform the clone. Code generation
//! re-renders only dirty regions against the original text, so untouched
//! formatting survives byte-for-byte.

use crate::adapter::{Adapter, ParsedElement};
use crate::error::{AdapterError, AdapterResult};
use crate::tree::{AttrValue, Attribute, ElementNode, ElementTree, Node, TextNode};
use realm_registry::{ElementInfo, FrameworkMeta};
use realm_types::{RealmId, SourceLocation, SourceSpan, StructureEdit};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Component name used when no enclosing declaration is found.
const ANONYMOUS: &str = "Anonymous";

/// The reference JSX/TSX adapter.
#[derive(Debug, Default)]
pub struct JsxAdapter;

impl JsxAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn locate<'t>(&self, tree: &'t ElementTree, id: &RealmId) -> Option<&'t ElementNode> {
        tree.find_at(id.span.start.line, id.span.start.column)
    }

    fn locate_mut_or_err<'t>(
        tree: &'t mut ElementTree,
        id: &RealmId,
    ) -> AdapterResult<&'t mut ElementNode> {
        tree.find_at_mut(id.span.start.line, id.span.start.column)
            .ok_or_else(|| AdapterError::UnknownNode(id.hash.clone()))
    }
}

impl Adapter for JsxAdapter {
    fn name(&self) -> &str {
        "jsx"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn detect(&self, file_path: &str, content: &str) -> bool {
        let lower = file_path.to_ascii_lowercase();
        if lower.ends_with(".jsx") || lower.ends_with(".tsx") {
            return true;
        }
        (lower.ends_with(".js") || lower.ends_with(".ts"))
            && (content.contains("/>") || content.contains("</"))
    }

    fn parse(&self, file_path: &str, content: &str) -> AdapterResult<ElementTree> {
        let mut scanner = Scanner::new(content);
        let (mut roots, decls) = scanner.scan()?;
        assign_identities(&mut roots, &decls);
        Ok(ElementTree {
            file_path: file_path.to_string(),
            roots,
        })
    }

    fn parse_element(&self, tree: &ElementTree, id: &RealmId) -> Option<ParsedElement> {
        self.locate(tree, id).map(|node| ParsedElement {
            info: element_info(node, &tree.file_path, None),
        })
    }

    fn find_all_elements(&self, tree: &ElementTree) -> Vec<ParsedElement> {
        let mut out = Vec::new();
        for root in &tree.roots {
            collect_elements(root, &tree.file_path, None, &mut out);
        }
        out
    }

    fn apply_styles(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        property: &str,
        value: Option<&str>,
    ) -> AdapterResult<ElementTree> {
        let mut next = tree.clone();
        let node = Self::locate_mut_or_err(&mut next, target)?;
        let key = to_camel_case(property);

        if node.styles.is_empty() {
            if let Some(attr) = node.attribute("style") {
                // A style attribute we could not parse would be clobbered
                // by a managed rewrite.
                if !matches!(attr.value, AttrValue::Literal(_)) {
                    warn!(target = %target.hash, "overwriting unparsed style expression");
                }
            }
        }

        match value {
            Some(v) => {
                node.styles.insert(key, v.to_string());
            }
            None => {
                node.styles.remove(&key);
            }
        }
        sync_style_attribute(node);
        node.dirty_open = true;
        Ok(next)
    }

    fn apply_text(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        text: &str,
    ) -> AdapterResult<ElementTree> {
        let mut next = tree.clone();
        let node = Self::locate_mut_or_err(&mut next, target)?;
        if node.self_closing {
            return Err(AdapterError::UnsupportedMutation(
                "self-closing element has no text content".into(),
            ));
        }
        let anchor = node.open_span.end;
        node.children = vec![Node::Text(TextNode {
            text: text.to_string(),
            span: SourceSpan::new(anchor, anchor),
        })];
        node.dirty_inner = true;
        Ok(next)
    }

    fn apply_classes(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        add: &[String],
        remove: &[String],
    ) -> AdapterResult<ElementTree> {
        let mut next = tree.clone();
        let node = Self::locate_mut_or_err(&mut next, target)?;

        let attr_name = if node.attribute("class").is_some() && node.attribute("className").is_none()
        {
            "class"
        } else {
            "className"
        };
        if let Some(attr) = node.attribute(attr_name) {
            if matches!(attr.value, AttrValue::Expr(_)) {
                return Err(AdapterError::UnsupportedMutation(
                    "class attribute is a dynamic expression".into(),
                ));
            }
        }

        // Preserve existing order; adds are appended, and adding a class
        // that is already present leaves the list unchanged.
        let mut classes = node.classes();
        classes.retain(|c| !remove.contains(c));
        for class in add {
            if !classes.contains(class) {
                classes.push(class.clone());
            }
        }

        if classes.is_empty() {
            node.attributes.retain(|a| a.name != attr_name);
        } else {
            let value = AttrValue::Literal(classes.join(" "));
            match node.attributes.iter_mut().find(|a| a.name == attr_name) {
                Some(attr) => attr.value = value,
                None => node.attributes.push(Attribute {
                    name: attr_name.to_string(),
                    value,
                }),
            }
        }
        node.dirty_open = true;
        Ok(next)
    }

    fn apply_attribute(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        name: &str,
        value: Option<&str>,
    ) -> AdapterResult<ElementTree> {
        let mut next = tree.clone();
        let node = Self::locate_mut_or_err(&mut next, target)?;
        match value {
            Some(v) => {
                let value = AttrValue::Literal(v.to_string());
                match node.attributes.iter_mut().find(|a| a.name == name) {
                    Some(attr) => attr.value = value,
                    None => node.attributes.push(Attribute {
                        name: name.to_string(),
                        value,
                    }),
                }
            }
            None => node.attributes.retain(|a| a.name != name),
        }
        node.dirty_open = true;
        Ok(next)
    }

    fn apply_structure(
        &self,
        tree: &ElementTree,
        target: &RealmId,
        edit: &StructureEdit,
    ) -> AdapterResult<ElementTree> {
        let mut next = tree.clone();
        let node = Self::locate_mut_or_err(&mut next, target)?;
        if node.self_closing {
            return Err(AdapterError::UnsupportedMutation(
                "self-closing element has no children".into(),
            ));
        }

        let positions: Vec<usize> = node
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, Node::Element(_)).then_some(i))
            .collect();

        match edit {
            StructureEdit::RemoveChild { index } => {
                let pos = *positions.get(*index).ok_or_else(|| {
                    AdapterError::UnsupportedMutation(format!("no child at index {index}"))
                })?;
                node.children.remove(pos);
            }
            StructureEdit::MoveChild { from, to } => {
                let from_pos = *positions.get(*from).ok_or_else(|| {
                    AdapterError::UnsupportedMutation(format!("no child at index {from}"))
                })?;
                let moved = node.children.remove(from_pos);
                let positions: Vec<usize> = node
                    .children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| matches!(c, Node::Element(_)).then_some(i))
                    .collect();
                let insert_at = positions.get(*to).copied().unwrap_or(node.children.len());
                node.children.insert(insert_at, moved);
            }
        }
        node.dirty_inner = true;
        Ok(next)
    }

    fn generate_code(&self, tree: &ElementTree, original: &str) -> AdapterResult<String> {
        let mut replacements: Vec<(usize, usize, String)> = Vec::new();
        for root in &tree.roots {
            collect_replacements(root, original, &mut replacements)?;
        }
        // Apply back-to-front so earlier offsets stay valid.
        replacements.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out = original.to_string();
        for (start, end, text) in replacements {
            if start > end || end > out.len() {
                return Err(AdapterError::Codegen(format!(
                    "replacement range {start}..{end} out of bounds"
                )));
            }
            out.replace_range(start..end, &text);
        }
        Ok(out)
    }
}

// ── parsing ─────────────────────────────────────────────────────

/// Byte cursor with line/column tracking. Lines and columns are 1-based.
struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn loc(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.col, self.pos)
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.src.get(self.pos).copied()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn restore(&mut self, loc: SourceLocation) {
        self.pos = loc.byte_offset;
        self.line = loc.line;
        self.col = loc.column;
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        if self.peek().is_some_and(is_ident_start) {
            self.bump();
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    /// Consumes a string literal. The opening quote is already consumed.
    fn skip_string(&mut self, quote: u8) {
        while let Some(b) = self.bump() {
            if b == b'\\' {
                self.bump();
            } else if b == quote {
                return;
            }
        }
    }

    /// At `{`: consumes the balanced brace region, returning the inner
    /// text (without the outer braces).
    fn read_braced(&mut self) -> AdapterResult<String> {
        let open = self.loc();
        self.bump(); // '{'
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            match b {
                b'{' => {
                    depth += 1;
                    self.bump();
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = String::from_utf8_lossy(&self.src[inner_start..self.pos])
                            .into_owned();
                        self.bump(); // '}'
                        return Ok(inner);
                    }
                    self.bump();
                }
                b'"' | b'\'' | b'`' => {
                    self.bump();
                    self.skip_string(b);
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                _ => {
                    self.bump();
                }
            }
        }
        Err(AdapterError::parse(
            open.line,
            open.column,
            "unterminated expression",
        ))
    }

    fn skip_line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                return;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while let Some(b) = self.bump() {
            if b == b'*' && self.peek() == Some(b'/') {
                self.bump();
                return;
            }
        }
    }

    /// Scans the whole file for JSX roots and component declarations.
    fn scan(&mut self) -> AdapterResult<(Vec<ElementNode>, Vec<(usize, String)>)> {
        let mut roots = Vec::new();
        let mut decls: Vec<(usize, String)> = Vec::new();
        // Last significant byte and last identifier word, for deciding
        // whether a '<' sits in expression position.
        let mut prev_sig: u8 = 0;
        let mut prev_word = String::new();

        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'"' | b'\'' | b'`' => {
                    self.bump();
                    self.skip_string(b);
                    prev_sig = b;
                    prev_word.clear();
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.skip_block_comment(),
                b'<' if self.peek_at(1).is_some_and(is_ident_start)
                    && jsx_context(prev_sig, &prev_word) =>
                {
                    let snapshot = self.loc();
                    match self.parse_element() {
                        Ok(el) => {
                            roots.push(el);
                            prev_sig = b'>';
                            prev_word.clear();
                        }
                        Err(_) => {
                            // Not JSX after all; treat '<' as an operator.
                            self.restore(snapshot);
                            self.bump();
                            prev_sig = b'<';
                            prev_word.clear();
                        }
                    }
                }
                _ if is_ident_start(b) => {
                    let start = self.pos;
                    let word = self.read_ident();
                    if prev_word == "function" {
                        decls.push((start, word.clone()));
                    } else if matches!(prev_word.as_str(), "const" | "let" | "var")
                        && word.chars().next().is_some_and(char::is_uppercase)
                    {
                        // Capitalized binding: component convention.
                        decls.push((start, word.clone()));
                    }
                    prev_sig = *word.as_bytes().last().unwrap_or(&0);
                    prev_word = word;
                }
                _ => {
                    prev_sig = b;
                    prev_word.clear();
                    self.bump();
                }
            }
        }
        Ok((roots, decls))
    }

    /// Parses one element. The cursor sits on `<`.
    fn parse_element(&mut self) -> AdapterResult<ElementNode> {
        let start = self.loc();
        self.bump(); // '<'
        let tag = self.read_ident();
        if tag.is_empty() {
            return Err(AdapterError::parse(start.line, start.column, "missing tag"));
        }

        let mut attributes = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => {
                    return Err(AdapterError::parse(
                        start.line,
                        start.column,
                        "unterminated opening tag",
                    ))
                }
                Some(b'/') => {
                    self.bump();
                    self.skip_ws();
                    if self.peek() != Some(b'>') {
                        return Err(AdapterError::parse(
                            self.line,
                            self.col,
                            "expected '>' after '/'",
                        ));
                    }
                    let gt = self.loc();
                    self.bump();
                    let span = SourceSpan::new(start, gt);
                    return Ok(self.finish_element(tag, attributes, span, span, None, Vec::new(), true));
                }
                Some(b'>') => {
                    let gt = self.loc();
                    self.bump();
                    let open_span = SourceSpan::new(start, gt);
                    return self.parse_children(start, tag, attributes, open_span);
                }
                Some(_) => {
                    let attr = self.parse_attribute()?;
                    attributes.push(attr);
                }
            }
        }
    }

    fn parse_attribute(&mut self) -> AdapterResult<Attribute> {
        let at = self.loc();
        let name = self.read_ident();
        if name.is_empty() {
            return Err(AdapterError::parse(
                at.line,
                at.column,
                "expected attribute name",
            ));
        }
        self.skip_ws();
        if self.peek() != Some(b'=') {
            return Ok(Attribute {
                name,
                value: AttrValue::Bare,
            });
        }
        self.bump(); // '='
        self.skip_ws();
        let value = match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.bump();
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b == q {
                        break;
                    }
                    self.bump();
                }
                if self.peek() != Some(q) {
                    return Err(AdapterError::parse(
                        at.line,
                        at.column,
                        "unterminated attribute value",
                    ));
                }
                let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                self.bump(); // closing quote
                AttrValue::Literal(text)
            }
            Some(b'{') => AttrValue::Expr(self.read_braced()?.trim().to_string()),
            _ => {
                return Err(AdapterError::parse(
                    at.line,
                    at.column,
                    "expected attribute value",
                ))
            }
        };
        Ok(Attribute { name, value })
    }

    fn parse_children(
        &mut self,
        start: SourceLocation,
        tag: String,
        attributes: Vec<Attribute>,
        open_span: SourceSpan,
    ) -> AdapterResult<ElementNode> {
        let inner_start = self.pos;
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(AdapterError::parse(
                        start.line,
                        start.column,
                        format!("missing closing tag for <{tag}>"),
                    ))
                }
                Some(b'<') if self.peek_at(1) == Some(b'/') => {
                    let close_start = self.pos;
                    self.bump();
                    self.bump();
                    let close_tag = self.read_ident();
                    self.skip_ws();
                    if self.peek() != Some(b'>') {
                        return Err(AdapterError::parse(
                            self.line,
                            self.col,
                            "malformed closing tag",
                        ));
                    }
                    let gt = self.loc();
                    self.bump();
                    if close_tag != tag {
                        return Err(AdapterError::parse(
                            gt.line,
                            gt.column,
                            format!("expected </{tag}>, found </{close_tag}>"),
                        ));
                    }
                    let span = SourceSpan::new(start, gt);
                    return Ok(self.finish_element(
                        tag,
                        attributes,
                        span,
                        open_span,
                        Some((inner_start, close_start)),
                        children,
                        false,
                    ));
                }
                Some(b'<') if self.peek_at(1).is_some_and(is_ident_start) => {
                    children.push(Node::Element(self.parse_element()?));
                }
                Some(b'<') => {
                    return Err(AdapterError::parse(self.line, self.col, "stray '<'"));
                }
                Some(b'{') => {
                    let expr_start = self.loc();
                    let inner = self.read_braced()?;
                    let end = self.loc();
                    children.push(Node::Expr(TextNode {
                        text: inner,
                        span: SourceSpan::new(expr_start, end),
                    }));
                }
                Some(_) => {
                    let text_start = self.loc();
                    let from = self.pos;
                    while let Some(b) = self.peek() {
                        if b == b'<' || b == b'{' {
                            break;
                        }
                        self.bump();
                    }
                    let text = String::from_utf8_lossy(&self.src[from..self.pos]).into_owned();
                    children.push(Node::Text(TextNode {
                        text,
                        span: SourceSpan::new(text_start, self.loc()),
                    }));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_element(
        &self,
        tag: String,
        attributes: Vec<Attribute>,
        span: SourceSpan,
        open_span: SourceSpan,
        inner_range: Option<(usize, usize)>,
        children: Vec<Node>,
        self_closing: bool,
    ) -> ElementNode {
        let styles = parse_style_attribute(&attributes);
        ElementNode {
            tag,
            attributes,
            styles,
            span,
            open_span,
            inner_range,
            children,
            self_closing,
            component: ANONYMOUS.to_string(),
            ast_path: String::new(),
            dirty_open: false,
            dirty_inner: false,
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-' | b'.' | b':')
}

/// Whether a `<` at this point sits in expression position.
fn jsx_context(prev_sig: u8, prev_word: &str) -> bool {
    prev_sig == 0
        || matches!(
            prev_sig,
            b'(' | b',' | b'?' | b':' | b'&' | b'|' | b'=' | b'{' | b'[' | b';' | b'>'
        )
        || prev_word == "return"
}

// ── identity assignment ─────────────────────────────────────────

/// Resolves component names and structural paths for every element.
fn assign_identities(roots: &mut [ElementNode], decls: &[(usize, String)]) {
    let mut root_counts: HashMap<(String, String), usize> = HashMap::new();
    for root in roots {
        let component = decls
            .iter()
            .rev()
            .find(|(pos, _)| *pos < root.span.start.byte_offset)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        let slot = root_counts
            .entry((component.clone(), root.tag.clone()))
            .or_insert(0);
        let path = format!("{component}/{}[{slot}]", root.tag);
        *slot += 1;
        assign_paths(root, &component, &path);
    }
}

fn assign_paths(node: &mut ElementNode, component: &str, path: &str) {
    node.component = component.to_string();
    node.ast_path = path.to_string();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for child in &mut node.children {
        if let Node::Element(el) = child {
            let slot = counts.entry(el.tag.clone()).or_insert(0);
            let child_path = format!("{path}/{}[{slot}]", el.tag);
            *slot += 1;
            assign_paths(el, component, &child_path);
        }
    }
}

// ── element info ────────────────────────────────────────────────

fn realm_id_for(node: &ElementNode, file_path: &str) -> RealmId {
    RealmId::generate(file_path, &node.component, &node.ast_path, node.span)
}

fn element_info(node: &ElementNode, file_path: &str, parent: Option<&str>) -> ElementInfo {
    let realm_id = realm_id_for(node, file_path);
    let mut attributes = BTreeMap::new();
    for attr in &node.attributes {
        let value = match &attr.value {
            AttrValue::Literal(s) => s.clone(),
            AttrValue::Expr(e) => format!("{{{e}}}"),
            AttrValue::Bare => "true".to_string(),
        };
        attributes.insert(attr.name.clone(), value);
    }
    let children = node
        .children
        .iter()
        .filter_map(|c| match c {
            Node::Element(el) => Some(realm_id_for(el, file_path).hash),
            _ => None,
        })
        .collect();

    let mut info = ElementInfo::new(
        realm_id,
        &node.tag,
        FrameworkMeta {
            framework: "jsx".into(),
            style_system: "inline".into(),
            is_component: node.is_component(),
        },
    );
    info.attributes = attributes;
    info.styles = node.styles.clone();
    info.text_content = node.text_content();
    info.children = children;
    info.parent_id = parent.map(str::to_string);
    info
}

fn collect_elements(
    node: &ElementNode,
    file_path: &str,
    parent: Option<&str>,
    out: &mut Vec<ParsedElement>,
) {
    let info = element_info(node, file_path, parent);
    let hash = info.realm_id.hash.clone();
    out.push(ParsedElement { info });
    for child in &node.children {
        if let Node::Element(el) = child {
            collect_elements(el, file_path, Some(&hash), out);
        }
    }
}

// ── styles ──────────────────────────────────────────────────────

/// Parses `style={{ key: 'value', ... }}` into a map. Returns an empty
/// map when the attribute is absent or too dynamic to understand.
fn parse_style_attribute(attributes: &[Attribute]) -> BTreeMap<String, String> {
    let Some(attr) = attributes.iter().find(|a| a.name == "style") else {
        return BTreeMap::new();
    };
    let AttrValue::Expr(expr) = &attr.value else {
        return BTreeMap::new();
    };
    let body = expr.trim();
    let Some(body) = body.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        return BTreeMap::new();
    };

    let mut styles = BTreeMap::new();
    for pair in split_top_level(body) {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches(|c| c == '\'' || c == '"');
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
        if !key.is_empty() && !value.is_empty() {
            styles.insert(key.to_string(), value.to_string());
        }
    }
    styles
}

/// Splits on commas that are not nested inside quotes, braces, or parens.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(&s[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

/// Rewrites the `style` attribute from the node's style map, removing it
/// when the map is empty.
fn sync_style_attribute(node: &mut ElementNode) {
    if node.styles.is_empty() {
        node.attributes.retain(|a| a.name != "style");
        return;
    }
    let rendered = render_style_object(&node.styles);
    match node.attributes.iter_mut().find(|a| a.name == "style") {
        Some(attr) => attr.value = AttrValue::Expr(rendered),
        None => node.attributes.push(Attribute {
            name: "style".to_string(),
            value: AttrValue::Expr(rendered),
        }),
    }
}

fn render_style_object(styles: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = styles
        .iter()
        .map(|(k, v)| {
            if v.parse::<f64>().is_ok() {
                format!("{k}: {v}")
            } else {
                format!("{k}: '{v}'")
            }
        })
        .collect();
    format!("{{ {} }}", parts.join(", "))
}

/// `background-color` → `backgroundColor`. Already-camel input passes
/// through unchanged.
fn to_camel_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    let mut upper_next = false;
    for c in property.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ── code generation ─────────────────────────────────────────────

fn render_open_tag(node: &ElementNode) -> String {
    let mut out = String::from("<");
    out.push_str(&node.tag);
    for attr in &node.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        match &attr.value {
            AttrValue::Literal(s) => {
                out.push_str("=\"");
                out.push_str(s);
                out.push('"');
            }
            AttrValue::Expr(e) => {
                out.push_str("={");
                out.push_str(e);
                out.push('}');
            }
            AttrValue::Bare => {}
        }
    }
    if node.self_closing {
        out.push_str(" />");
    } else {
        out.push('>');
    }
    out
}

fn slice(original: &str, start: usize, end: usize) -> AdapterResult<&str> {
    original
        .get(start..end)
        .ok_or_else(|| AdapterError::Codegen(format!("span {start}..{end} out of bounds")))
}

fn render_element(node: &ElementNode, original: &str) -> AdapterResult<String> {
    if !node.dirty_open && !node.dirty_inner && !has_dirty_descendant(node) {
        return Ok(slice(
            original,
            node.span.start.byte_offset,
            node.span.end.byte_offset + 1,
        )?
        .to_string());
    }
    let mut out = if node.dirty_open {
        render_open_tag(node)
    } else {
        slice(
            original,
            node.open_span.start.byte_offset,
            node.open_span.end.byte_offset + 1,
        )?
        .to_string()
    };
    if node.self_closing {
        return Ok(out);
    }
    let (inner_start, inner_end) = node
        .inner_range
        .ok_or_else(|| AdapterError::Codegen("missing inner range".into()))?;
    if node.dirty_inner || has_dirty_descendant(node) {
        out.push_str(&render_children(node, original)?);
    } else {
        out.push_str(slice(original, inner_start, inner_end)?);
    }
    // Closing tag, verbatim from the original.
    out.push_str(slice(original, inner_end, node.span.end.byte_offset + 1)?);
    Ok(out)
}

fn render_children(node: &ElementNode, original: &str) -> AdapterResult<String> {
    let mut out = String::new();
    for child in &node.children {
        match child {
            Node::Text(t) => out.push_str(&t.text),
            Node::Expr(e) => {
                out.push('{');
                out.push_str(&e.text);
                out.push('}');
            }
            Node::Element(el) => out.push_str(&render_element(el, original)?),
        }
    }
    Ok(out)
}

fn has_dirty_descendant(node: &ElementNode) -> bool {
    node.children.iter().any(|c| match c {
        Node::Element(el) => el.dirty_open || el.dirty_inner || has_dirty_descendant(el),
        _ => false,
    })
}

/// Collects minimal byte-range replacements for all dirty regions.
fn collect_replacements(
    node: &ElementNode,
    original: &str,
    out: &mut Vec<(usize, usize, String)>,
) -> AdapterResult<()> {
    if node.dirty_open {
        out.push((
            node.open_span.start.byte_offset,
            node.open_span.end.byte_offset + 1,
            render_open_tag(node),
        ));
    }
    if node.dirty_inner {
        let (start, end) = node
            .inner_range
            .ok_or_else(|| AdapterError::Codegen("missing inner range".into()))?;
        out.push((start, end, render_children(node, original)?));
    } else {
        for child in &node.children {
            if let Node::Element(el) = child {
                collect_replacements(el, original, out)?;
            }
        }
    }
    Ok(())
}
