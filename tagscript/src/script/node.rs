//! Parse tree and visitor.

use super::element::Element;
use super::lexer::{TAG_CLOSE, TAG_OPEN};

/// A `{$ FOR variable start end [step] $} … {$ END $}` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub variable: String,
    pub start: Element,
    pub end: Element,
    pub step: Option<Element>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Document(Vec<Node>),
    Text(String),
    ForLoop(ForLoop),
    Echo(Vec<Element>),
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document(children) => children,
            Node::ForLoop(l) => &l.children,
            Node::Text(_) | Node::Echo(_) => &[],
        }
    }

    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        match self {
            Node::Document(children) => visitor.visit_document(children),
            Node::Text(text) => visitor.visit_text(text),
            Node::ForLoop(l) => visitor.visit_for_loop(l),
            Node::Echo(elements) => visitor.visit_echo(elements),
        }
    }

    /// Rebuild template source for this subtree.
    pub fn to_source(&self) -> String {
        let mut writer = SourceWriter::default();
        match self.accept(&mut writer) {
            Ok(()) => writer.out,
            Err(never) => match never {},
        }
    }
}

/// Depth-first traversal hooks, one per node kind.
///
/// The default implementations just descend into children, so a visitor
/// only overrides the kinds it cares about.
pub trait Visitor {
    type Error;

    fn visit_document(&mut self, children: &[Node]) -> Result<(), Self::Error> {
        walk(self, children)
    }

    fn visit_text(&mut self, _text: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_for_loop(&mut self, node: &ForLoop) -> Result<(), Self::Error> {
        walk(self, &node.children)
    }

    fn visit_echo(&mut self, _elements: &[Element]) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Visit `children` in order, stopping at the first error.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, children: &[Node]) -> Result<(), V::Error> {
    children.iter().try_for_each(|child| child.accept(visitor))
}

// ── NodeStats ─────────────────────────────────────────────────────────────────

/// Node counts for a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub documents: usize,
    pub texts: usize,
    pub loops: usize,
    pub echoes: usize,
    pub max_loop_depth: usize,
    depth: usize,
}

impl NodeStats {
    pub fn collect(tree: &Node) -> Self {
        let mut stats = NodeStats::default();
        match tree.accept(&mut stats) {
            Ok(()) => stats,
            Err(never) => match never {},
        }
    }
}

impl Visitor for NodeStats {
    type Error = std::convert::Infallible;

    fn visit_document(&mut self, children: &[Node]) -> Result<(), Self::Error> {
        self.documents += 1;
        walk(self, children)
    }

    fn visit_text(&mut self, _text: &str) -> Result<(), Self::Error> {
        self.texts += 1;
        Ok(())
    }

    fn visit_for_loop(&mut self, node: &ForLoop) -> Result<(), Self::Error> {
        self.loops += 1;
        self.depth += 1;
        self.max_loop_depth = self.max_loop_depth.max(self.depth);
        walk(self, &node.children)?;
        self.depth -= 1;
        Ok(())
    }

    fn visit_echo(&mut self, _elements: &[Element]) -> Result<(), Self::Error> {
        self.echoes += 1;
        Ok(())
    }
}

// ── SourceWriter ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct SourceWriter {
    out: String,
}

impl SourceWriter {
    fn tag(&mut self, name: &str, elements: &[&Element]) {
        self.out.push_str(TAG_OPEN);
        self.out.push(' ');
        self.out.push_str(name);
        for e in elements {
            self.out.push(' ');
            self.out.push_str(&e.as_text());
        }
        self.out.push(' ');
        self.out.push_str(TAG_CLOSE);
    }
}

impl Visitor for SourceWriter {
    type Error = std::convert::Infallible;

    fn visit_text(&mut self, text: &str) -> Result<(), Self::Error> {
        for c in text.chars() {
            if matches!(c, '{' | '\\') {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        Ok(())
    }

    fn visit_for_loop(&mut self, node: &ForLoop) -> Result<(), Self::Error> {
        let variable = Element::Variable(node.variable.clone());
        let mut args = vec![&variable, &node.start, &node.end];
        args.extend(node.step.as_ref());
        self.tag("FOR", &args);
        walk(self, &node.children)?;
        self.tag("END", &[]);
        Ok(())
    }

    fn visit_echo(&mut self, elements: &[Element]) -> Result<(), Self::Error> {
        // Canonical echo form is `{$= … $}`; `{$ = … $}` lexes the same.
        self.out.push_str(TAG_OPEN);
        self.out.push('=');
        for e in elements {
            self.out.push(' ');
            self.out.push_str(&e.as_text());
        }
        self.out.push(' ');
        self.out.push_str(TAG_CLOSE);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
