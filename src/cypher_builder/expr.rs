//! Cypher expression tree.
//!
//! Nested relationship levels live here as comprehension and subquery
//! expressions, so an enclosing projection owns its children outright.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Contains,
    StartsWith,
    EndsWith,
    RegexMatch,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
            ComparisonOp::In => "IN",
            ComparisonOp::Contains => "CONTAINS",
            ComparisonOp::StartsWith => "STARTS WITH",
            ComparisonOp::EndsWith => "ENDS WITH",
            ComparisonOp::RegexMatch => "=~",
        }
    }
}

/// Traversal direction as written in the pattern, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    /// `-[]->`
    Right,
    /// `<-[]-`
    Left,
    /// `-[]-`
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub variable: Option<String>,
    pub label: Option<String>,
}

impl NodePattern {
    pub fn bound(variable: impl Into<String>) -> Self {
        NodePattern {
            variable: Some(variable.into()),
            label: None,
        }
    }

    pub fn labelled(variable: impl Into<String>, label: impl Into<String>) -> Self {
        NodePattern {
            variable: Some(variable.into()),
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPattern {
    pub variable: Option<String>,
    pub edge_label: String,
    pub direction: PatternDirection,
}

/// A node, optionally followed by one relationship hop.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub start: NodePattern,
    pub hop: Option<(RelationshipPattern, NodePattern)>,
}

impl Pattern {
    pub fn node(node: NodePattern) -> Self {
        Pattern {
            start: node,
            hop: None,
        }
    }

    pub fn hop(start: NodePattern, relationship: RelationshipPattern, end: NodePattern) -> Self {
        Pattern {
            start,
            hop: Some((relationship, end)),
        }
    }

    fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = self.start.variable.iter().map(String::as_str).collect();
        if let Some((rel, end)) = &self.hop {
            vars.extend(rel.variable.as_deref());
            vars.extend(end.variable.as_deref());
        }
        vars
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionEntry {
    /// `.name`
    Shorthand(String),
    /// `key: expr`
    Keyed(String, CypherExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CypherExpr {
    Variable(String),
    Property {
        variable: String,
        key: String,
    },
    Parameter(String),
    Boolean(bool),
    /// Compiler- or schema-authored text (statements, sort keys). Caller
    /// literals never become string literals; they are parameters.
    StringLiteral(String),
    List(Vec<CypherExpr>),
    Comparison {
        left: Box<CypherExpr>,
        op: ComparisonOp,
        right: Box<CypherExpr>,
    },
    Not(Box<CypherExpr>),
    And(Vec<CypherExpr>),
    Or(Vec<CypherExpr>),
    IsNull(Box<CypherExpr>),
    IsNotNull(Box<CypherExpr>),
    Add(Box<CypherExpr>, Box<CypherExpr>),
    FunctionCall {
        name: String,
        args: Vec<CypherExpr>,
    },
    Map(Vec<(String, CypherExpr)>),
    MapProjection {
        variable: String,
        entries: Vec<ProjectionEntry>,
    },
    PatternComprehension {
        pattern: Pattern,
        filter: Option<Box<CypherExpr>>,
        projection: Box<CypherExpr>,
    },
    ListComprehension {
        variable: String,
        list: Box<CypherExpr>,
        filter: Option<Box<CypherExpr>>,
        projection: Option<Box<CypherExpr>>,
    },
    Slice {
        list: Box<CypherExpr>,
        from: Option<Box<CypherExpr>>,
        to: Option<Box<CypherExpr>>,
    },
    /// `EXISTS { MATCH pattern WHERE filter }`
    Exists {
        pattern: Pattern,
        filter: Option<Box<CypherExpr>>,
    },
    Case {
        when: Box<CypherExpr>,
        then: Box<CypherExpr>,
        otherwise: Box<CypherExpr>,
    },
    Reduce {
        accumulator: String,
        init: Box<CypherExpr>,
        variable: String,
        list: Box<CypherExpr>,
        expression: Box<CypherExpr>,
    },
}

impl CypherExpr {
    pub fn variable(name: impl Into<String>) -> Self {
        CypherExpr::Variable(name.into())
    }

    pub fn property(variable: impl Into<String>, key: impl Into<String>) -> Self {
        CypherExpr::Property {
            variable: variable.into(),
            key: key.into(),
        }
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        CypherExpr::Parameter(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<CypherExpr>) -> Self {
        CypherExpr::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn compare(left: CypherExpr, op: ComparisonOp, right: CypherExpr) -> Self {
        CypherExpr::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn negate(expr: CypherExpr) -> Self {
        match expr {
            CypherExpr::Boolean(b) => CypherExpr::Boolean(!b),
            other => CypherExpr::Not(Box::new(other)),
        }
    }

    /// Conjunction with constant folding: `true` operands drop out, any
    /// `false` operand makes the whole conjunction `false`. `None` when
    /// nothing constrains.
    pub fn and_all(operands: Vec<CypherExpr>) -> Option<CypherExpr> {
        let mut kept = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                CypherExpr::Boolean(true) => {}
                CypherExpr::Boolean(false) => return Some(CypherExpr::Boolean(false)),
                CypherExpr::And(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => None,
            1 => kept.pop(),
            _ => Some(CypherExpr::And(kept)),
        }
    }

    /// Disjunction with constant folding: any `true` operand makes it `true`,
    /// `false` operands drop out, and an empty disjunction is `false`.
    pub fn or_any(operands: Vec<CypherExpr>) -> CypherExpr {
        let mut kept = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                CypherExpr::Boolean(true) => return CypherExpr::Boolean(true),
                CypherExpr::Boolean(false) => {}
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => CypherExpr::Boolean(false),
            1 => kept.pop().unwrap_or(CypherExpr::Boolean(false)),
            _ => CypherExpr::Or(kept),
        }
    }

    /// Parameter names referenced anywhere in the expression, in first-use order
    pub fn parameters(&self) -> Vec<String> {
        let mut seen = Vec::new();
        self.walk(&mut |expr| {
            if let CypherExpr::Parameter(name) = expr {
                if !seen.contains(name) {
                    seen.push(name.clone());
                }
            }
        });
        seen
    }

    /// Variables the expression reads that it does not bind itself
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut free = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut free);
        free
    }

    fn collect_free(&self, scope: &mut Vec<String>, free: &mut BTreeSet<String>) {
        match self {
            CypherExpr::Variable(v) => note(v, scope, free),
            CypherExpr::Property { variable, .. } => note(variable, scope, free),
            CypherExpr::MapProjection { variable, entries } => {
                note(variable, scope, free);
                for entry in entries {
                    if let ProjectionEntry::Keyed(_, e) = entry {
                        e.collect_free(scope, free);
                    }
                }
            }
            CypherExpr::PatternComprehension {
                pattern,
                filter,
                projection,
            } => {
                let depth = enter_pattern(pattern, scope, free);
                if let Some(f) = filter {
                    f.collect_free(scope, free);
                }
                projection.collect_free(scope, free);
                scope.truncate(depth);
            }
            CypherExpr::Exists { pattern, filter } => {
                let depth = enter_pattern(pattern, scope, free);
                if let Some(f) = filter {
                    f.collect_free(scope, free);
                }
                scope.truncate(depth);
            }
            CypherExpr::ListComprehension {
                variable,
                list,
                filter,
                projection,
            } => {
                list.collect_free(scope, free);
                scope.push(variable.clone());
                if let Some(f) = filter {
                    f.collect_free(scope, free);
                }
                if let Some(p) = projection {
                    p.collect_free(scope, free);
                }
                scope.pop();
            }
            CypherExpr::Reduce {
                accumulator,
                init,
                variable,
                list,
                expression,
            } => {
                init.collect_free(scope, free);
                list.collect_free(scope, free);
                scope.push(accumulator.clone());
                scope.push(variable.clone());
                expression.collect_free(scope, free);
                scope.truncate(scope.len() - 2);
            }
            _ => {
                for child in self.children() {
                    child.collect_free(scope, free);
                }
            }
        }
    }

    pub(crate) fn children(&self) -> Vec<&CypherExpr> {
        match self {
            CypherExpr::Variable(_)
            | CypherExpr::Property { .. }
            | CypherExpr::Parameter(_)
            | CypherExpr::Boolean(_)
            | CypherExpr::StringLiteral(_) => vec![],
            CypherExpr::List(items) | CypherExpr::And(items) | CypherExpr::Or(items) => {
                items.iter().collect()
            }
            CypherExpr::FunctionCall { args, .. } => args.iter().collect(),
            CypherExpr::Comparison { left, right, .. } | CypherExpr::Add(left, right) => {
                vec![left.as_ref(), right.as_ref()]
            }
            CypherExpr::Not(e) | CypherExpr::IsNull(e) | CypherExpr::IsNotNull(e) => {
                vec![e.as_ref()]
            }
            CypherExpr::Map(entries) => entries.iter().map(|(_, e)| e).collect(),
            CypherExpr::MapProjection { entries, .. } => entries
                .iter()
                .filter_map(|entry| match entry {
                    ProjectionEntry::Keyed(_, e) => Some(e),
                    ProjectionEntry::Shorthand(_) => None,
                })
                .collect(),
            CypherExpr::PatternComprehension {
                filter, projection, ..
            } => filter.iter().map(|f| f.as_ref()).chain([projection.as_ref()]).collect(),
            CypherExpr::Exists { filter, .. } => filter.iter().map(|f| f.as_ref()).collect(),
            CypherExpr::ListComprehension {
                list,
                filter,
                projection,
                ..
            } => [Some(list), filter.as_ref(), projection.as_ref()]
                .into_iter()
                .flatten()
                .map(|b| b.as_ref())
                .collect(),
            CypherExpr::Slice { list, from, to } => [Some(list), from.as_ref(), to.as_ref()]
                .into_iter()
                .flatten()
                .map(|b| b.as_ref())
                .collect(),
            CypherExpr::Case {
                when,
                then,
                otherwise,
            } => vec![when.as_ref(), then.as_ref(), otherwise.as_ref()],
            CypherExpr::Reduce {
                init,
                list,
                expression,
                ..
            } => vec![init.as_ref(), list.as_ref(), expression.as_ref()],
        }
    }

    /// Pre-order traversal
    pub fn walk<F: FnMut(&CypherExpr)>(&self, visit: &mut F) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

fn note(name: &str, scope: &[String], free: &mut BTreeSet<String>) {
    if !scope.iter().any(|s| s == name) {
        free.insert(name.to_string());
    }
}

/// The start node of a pattern must already be bound; the hop introduces the
/// rest. Returns the scope depth to restore.
fn enter_pattern(pattern: &Pattern, scope: &mut Vec<String>, free: &mut BTreeSet<String>) -> usize {
    if let Some(start) = &pattern.start.variable {
        note(start, scope, free);
    }
    let depth = scope.len();
    scope.extend(pattern.variables().into_iter().skip(1).map(str::to_string));
    depth
}
