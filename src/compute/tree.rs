//! Depth-bounded production tree of a grammar.
//!
//! Nodes live in an arena and are expanded with an explicit work-list, so
//! recursive grammars are truncated at the depth bound instead of recursing
//! without end. A node at depth `d` is expanded when `d <= max_depth`.

use crate::schema::{Grammar, Symbol};

/// Index of a node in a [`GrammarTree`].
pub type NodeId = usize;

/// One expansion step.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub symbol: Symbol,
    /// Number of productions taken from the root to reach this node.
    pub depth: usize,
    pub parent: Option<NodeId>,
    /// Alternative expansions, each a sequence of child nodes.
    pub productions: Vec<Vec<NodeId>>,
}

/// Bounded expansion tree rooted at the grammar's root rule.
#[derive(Debug, Clone)]
pub struct GrammarTree {
    nodes: Vec<TreeNode>,
    max_depth: usize,
}

impl GrammarTree {
    /// Expand the grammar's root rule down to `max_depth`.
    pub fn build(grammar: &Grammar, max_depth: usize) -> Self {
        let root = grammar
            .root()
            .map(|rule| Symbol::non_terminal(rule.name.clone()))
            .unwrap_or_else(|| Symbol::non_terminal(""));
        Self::build_from(grammar, root, max_depth)
    }

    /// Expand an arbitrary root symbol.
    pub fn build_from(grammar: &Grammar, root: Symbol, max_depth: usize) -> Self {
        let mut nodes = vec![TreeNode {
            symbol: root,
            depth: 0,
            parent: None,
            productions: Vec::new(),
        }];
        let mut pending = vec![0];

        while let Some(id) = pending.pop() {
            let depth = nodes[id].depth;
            if depth > max_depth {
                continue;
            }
            let Symbol::NonTerminal(name) = &nodes[id].symbol else {
                continue;
            };
            let Some(rule) = grammar.rule(name) else {
                continue;
            };

            let mut productions = Vec::with_capacity(rule.productions.len());
            for production in &rule.productions {
                if production.symbols.is_empty() {
                    continue;
                }
                let mut section = Vec::with_capacity(production.symbols.len());
                for symbol in &production.symbols {
                    let child = nodes.len();
                    nodes.push(TreeNode {
                        symbol: symbol.clone(),
                        depth: depth + 1,
                        parent: Some(id),
                        productions: Vec::new(),
                    });
                    pending.push(child);
                    section.push(child);
                }
                productions.push(section);
            }
            nodes[id].productions = productions;
        }

        Self { nodes, max_depth }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Every terminal string derivable from `id`, in production order.
    ///
    /// Exponential in the size of the tree; recomputed on every call.
    pub fn terminals(&self, id: NodeId) -> Vec<String> {
        let node = &self.nodes[id];
        if let Symbol::Terminal(text) = &node.symbol {
            return vec![text.clone()];
        }

        let mut result = Vec::new();
        for production in &node.productions {
            let mut options = self.terminals(production[0]);
            for &child in &production[1..] {
                if options.is_empty() {
                    break;
                }
                let suffixes = self.terminals(child);
                options = options
                    .iter()
                    .flat_map(|prefix| suffixes.iter().map(move |s| format!("{}{}", prefix, s)))
                    .collect();
            }
            result.extend(options);
        }
        result
    }

    /// Terminal strings of the whole tree.
    pub fn enumerate(&self) -> Vec<String> {
        self.terminals(self.root())
    }
}
