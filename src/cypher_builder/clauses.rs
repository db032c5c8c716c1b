//! Top-level clause sequence and the builder that enforces clause ordering.

use std::collections::BTreeSet;

use super::errors::CypherBuilderError;
use super::expr::{CypherExpr, NodePattern, Pattern};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: CypherExpr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub pattern: Pattern,
    pub filter: Option<CypherExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub variables: Vec<String>,
    pub order_by: Vec<OrderByItem>,
    pub skip: Option<CypherExpr>,
    pub limit: Option<CypherExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: CypherExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Match(MatchClause),
    With(WithClause),
    Create(NodePattern),
    /// `SET variable.key = value`
    Set {
        variable: String,
        key: String,
        value: CypherExpr,
    },
    /// `CALL apoc.util.validate(NOT (predicate), "Forbidden", [0])`
    Validate(CypherExpr),
    /// `CALL { ... }`; variables returned by the body become visible after it
    Call(Vec<Clause>),
    Return(Vec<ReturnItem>),
}

impl Clause {
    /// Graph variables this clause brings into scope
    pub fn introduced_variables(&self) -> Vec<String> {
        match self {
            Clause::Match(m) => {
                let mut vars: Vec<String> = m.pattern.start.variable.iter().cloned().collect();
                if let Some((rel, end)) = &m.pattern.hop {
                    vars.extend(rel.variable.iter().cloned());
                    vars.extend(end.variable.iter().cloned());
                }
                vars
            }
            Clause::Create(node) => node.variable.iter().cloned().collect(),
            Clause::Call(body) => body
                .iter()
                .filter_map(|c| match c {
                    Clause::Return(items) => Some(items),
                    _ => None,
                })
                .flatten()
                .filter_map(|item| match (&item.alias, &item.expr) {
                    (Some(alias), _) => Some(alias.clone()),
                    (None, CypherExpr::Variable(v)) => Some(v.clone()),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Graph variables this clause reads
    pub fn referenced_variables(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        match self {
            Clause::Match(m) => {
                if let Some(filter) = &m.filter {
                    refs.extend(filter.free_variables());
                }
            }
            Clause::With(w) => {
                refs.extend(w.variables.iter().cloned());
                for item in &w.order_by {
                    refs.extend(item.expr.free_variables());
                }
            }
            Clause::Set {
                variable, value, ..
            } => {
                refs.insert(variable.clone());
                refs.extend(value.free_variables());
            }
            Clause::Validate(pred) => refs.extend(pred.free_variables()),
            Clause::Return(items) => {
                for item in items {
                    refs.extend(item.expr.free_variables());
                }
            }
            Clause::Create(_) | Clause::Call(_) => {}
        }
        refs
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CypherQuery {
    pub clauses: Vec<Clause>,
}

/// Accumulates clauses and checks that every variable a clause reads was
/// introduced by an earlier clause at the same level.
#[derive(Debug, Default)]
pub struct CypherQueryBuilder {
    clauses: Vec<Clause>,
    bound: BTreeSet<String>,
}

impl CypherQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: Clause) -> Result<&mut Self, CypherBuilderError> {
        let mut visible = self.bound.clone();
        visible.extend(clause.introduced_variables());
        if let Clause::Call(body) = &clause {
            // The body is its own scope and may only import what is already bound.
            let mut inner = CypherQueryBuilder {
                clauses: Vec::new(),
                bound: self.bound.clone(),
            };
            for c in body {
                inner.push(c.clone())?;
            }
        }
        if let Some(unbound) = clause
            .referenced_variables()
            .into_iter()
            .find(|v| !visible.contains(v))
        {
            return Err(CypherBuilderError::UnboundVariable(unbound));
        }
        self.bound = visible;
        self.clauses.push(clause);
        Ok(self)
    }

    pub fn build(self) -> CypherQuery {
        CypherQuery {
            clauses: self.clauses,
        }
    }
}
