//! Human-readable dumps of a creation tree, for debug logging.
//!
//! ```
//! use itervote_wizard::{CreationTree, CreationTreeDebug, StepSpec, TreeFormatOptions, TreeStyle};
//!
//! let tree = CreationTree::build(StepSpec::linear(
//!     "general",
//!     "General",
//!     StepSpec::final_step("summary", "Summary"),
//! ))
//! .unwrap();
//!
//! let options = TreeFormatOptions { style: TreeStyle::Ascii, ..TreeFormatOptions::minimal() };
//! let dump = CreationTreeDebug::with_options(&tree, options).to_string();
//! assert_eq!(dump, "General\n+-- Summary\n");
//! ```

use std::fmt::{self, Write};

use crate::tree::{CreationTree, StepId, StepKind};

/// Branch drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// One dash per level.
    Compact,
}

/// What to include in a tree dump.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch drawing style.
    pub style: TreeStyle,
    /// Show each step's segment after its label.
    pub show_segments: bool,
    /// Show the node kind.
    pub show_kinds: bool,
    /// Show the handled fields of each step.
    pub show_fields: bool,
    /// Show the field names present in each step's query.
    pub show_query: bool,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_segments: true,
            show_kinds: true,
            show_fields: false,
            show_query: false,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including per-step field and query details.
    pub fn detailed() -> Self {
        Self {
            show_fields: true,
            show_query: true,
            ..Default::default()
        }
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_segments: false,
            show_kinds: false,
            show_fields: false,
            show_query: false,
            ..Default::default()
        }
    }
}

/// Renders a [`CreationTree`] through `Display`.
///
/// The active step, if set with [`highlight`](Self::highlight), is marked
/// with `*`.
pub struct CreationTreeDebug<'a> {
    tree: &'a CreationTree,
    options: TreeFormatOptions,
    highlight: Option<StepId>,
}

impl<'a> CreationTreeDebug<'a> {
    /// Dump `tree` with default options.
    pub fn new(tree: &'a CreationTree) -> Self {
        Self::with_options(tree, TreeFormatOptions::default())
    }

    /// Dump `tree` with custom options.
    pub fn with_options(tree: &'a CreationTree, options: TreeFormatOptions) -> Self {
        Self {
            tree,
            options,
            highlight: None,
        }
    }

    /// Mark `id` as the active step.
    pub fn highlight(mut self, id: StepId) -> Self {
        self.highlight = Some(id);
        self
    }

    fn write_node(
        &self,
        out: &mut impl Write,
        id: StepId,
        depth: usize,
        is_last: bool,
    ) -> fmt::Result {
        let node = &self.tree[id];

        out.write_str(&self.prefix(depth, is_last))?;
        if self.highlight == Some(id) {
            out.write_str("* ")?;
        }
        out.write_str(node.label())?;
        if self.options.show_segments {
            write!(out, " [{}]", node.segment())?;
        }
        if self.options.show_kinds {
            let kind = match node.kind() {
                StepKind::Linear(_) => "linear",
                StepKind::Final => "final",
                StepKind::Conditional { .. } => "conditional",
            };
            write!(out, " ({kind})")?;
        }
        out.write_char('\n')?;

        let detail = self.detail_prefix(depth);
        if self.options.show_fields {
            let fields = node.handled_fields();
            if !fields.is_empty() {
                let fields: Vec<_> = fields.into_iter().collect();
                writeln!(out, "{detail}  fields: {}", fields.join(", "))?;
            }
        }
        if self.options.show_query {
            let keys: Vec<String> = node.query().keys();
            if !keys.is_empty() {
                writeln!(out, "{detail}  query: {}", keys.join(", "))?;
            }
        }

        let children = node.children();
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.write_node(out, child, depth + 1, i + 1 == count)?;
        }
        Ok(())
    }

    fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "+--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }

    fn detail_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => "",
        };
        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix
    }
}

impl fmt::Display for CreationTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.tree.root(), 0, true)
    }
}
