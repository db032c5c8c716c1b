use super::clauses::{Clause, CypherQuery, MatchClause, OrderByItem, ReturnItem, WithClause};
use super::expr::{
    CypherExpr, NodePattern, Pattern, PatternDirection, ProjectionEntry, RelationshipPattern,
};

/// Canonical text form of a Cypher AST node
pub trait ToCypher {
    fn to_cypher(&self) -> String;
}

impl ToCypher for CypherQuery {
    fn to_cypher(&self) -> String {
        self.clauses
            .iter()
            .map(ToCypher::to_cypher)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ToCypher for Clause {
    fn to_cypher(&self) -> String {
        match self {
            Clause::Match(m) => m.to_cypher(),
            Clause::With(w) => w.to_cypher(),
            Clause::Create(node) => format!("CREATE {}", node.to_cypher()),
            Clause::Set {
                variable,
                key,
                value,
            } => format!("SET {}.{} = {}", variable, key, value.to_cypher()),
            Clause::Validate(predicate) => format!(
                "CALL apoc.util.validate(NOT ({}), \"{}\", [0])",
                predicate.to_cypher(),
                FORBIDDEN_MESSAGE
            ),
            Clause::Call(body) => {
                let inner = body
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("CALL {{\n{}\n}}", inner)
            }
            Clause::Return(items) => format!(
                "RETURN {}",
                items
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Message raised by `apoc.util.validate` when an authorization check fails
pub const FORBIDDEN_MESSAGE: &str = "Forbidden";

impl ToCypher for MatchClause {
    fn to_cypher(&self) -> String {
        match &self.filter {
            Some(filter) => format!(
                "MATCH {}\nWHERE {}",
                self.pattern.to_cypher(),
                filter.to_cypher()
            ),
            None => format!("MATCH {}", self.pattern.to_cypher()),
        }
    }
}

impl ToCypher for WithClause {
    fn to_cypher(&self) -> String {
        let mut out = format!("WITH {}", self.variables.join(", "));
        if !self.order_by.is_empty() {
            out.push_str("\nORDER BY ");
            out.push_str(
                &self
                    .order_by
                    .iter()
                    .map(ToCypher::to_cypher)
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if let Some(skip) = &self.skip {
            out.push_str(&format!("\nSKIP {}", skip.to_cypher()));
        }
        if let Some(limit) = &self.limit {
            out.push_str(&format!("\nLIMIT {}", limit.to_cypher()));
        }
        out
    }
}

impl ToCypher for OrderByItem {
    fn to_cypher(&self) -> String {
        format!(
            "{} {}",
            self.expr.to_cypher(),
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

impl ToCypher for ReturnItem {
    fn to_cypher(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} as {}", self.expr.to_cypher(), alias),
            None => self.expr.to_cypher(),
        }
    }
}

impl ToCypher for NodePattern {
    fn to_cypher(&self) -> String {
        let var = self.variable.as_deref().unwrap_or("");
        match &self.label {
            Some(label) => format!("({}:{})", var, label),
            None => format!("({})", var),
        }
    }
}

impl ToCypher for RelationshipPattern {
    fn to_cypher(&self) -> String {
        let body = format!(
            "[{}:{}]",
            self.variable.as_deref().unwrap_or(""),
            self.edge_label
        );
        match self.direction {
            PatternDirection::Right => format!("-{}->", body),
            PatternDirection::Left => format!("<-{}-", body),
            PatternDirection::Both => format!("-{}-", body),
        }
    }
}

impl ToCypher for Pattern {
    fn to_cypher(&self) -> String {
        match &self.hop {
            Some((rel, end)) => format!(
                "{}{}{}",
                self.start.to_cypher(),
                rel.to_cypher(),
                end.to_cypher()
            ),
            None => self.start.to_cypher(),
        }
    }
}

/// Double-quoted Cypher string literal
pub fn quote_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn join(exprs: &[CypherExpr], sep: &str) -> String {
    exprs
        .iter()
        .map(ToCypher::to_cypher)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Boolean operands that bind looser than the operator around them get parentheses
fn operand(expr: &CypherExpr) -> String {
    match expr {
        CypherExpr::And(_) | CypherExpr::Or(_) => format!("({})", expr.to_cypher()),
        _ => expr.to_cypher(),
    }
}

fn map_entries(entries: &[(String, CypherExpr)]) -> String {
    if entries.is_empty() {
        return "{ }".to_string();
    }
    let body = entries
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v.to_cypher()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{ {} }}", body)
}

impl ToCypher for CypherExpr {
    fn to_cypher(&self) -> String {
        match self {
            CypherExpr::Variable(v) => v.clone(),
            CypherExpr::Property { variable, key } => format!("{}.{}", variable, key),
            CypherExpr::Parameter(name) => format!("${}", name),
            CypherExpr::Boolean(b) => b.to_string(),
            CypherExpr::StringLiteral(s) => quote_string(s),
            CypherExpr::List(items) => format!("[{}]", join(items, ", ")),
            CypherExpr::Comparison { left, op, right } => {
                format!("{} {} {}", operand(left), op.symbol(), operand(right))
            }
            CypherExpr::Not(inner) => format!("NOT ({})", inner.to_cypher()),
            CypherExpr::And(items) => items.iter().map(operand).collect::<Vec<_>>().join(" AND "),
            CypherExpr::Or(items) => items.iter().map(operand).collect::<Vec<_>>().join(" OR "),
            CypherExpr::IsNull(inner) => format!("{} IS NULL", inner.to_cypher()),
            CypherExpr::IsNotNull(inner) => format!("{} IS NOT NULL", inner.to_cypher()),
            CypherExpr::Add(left, right) => {
                format!("({} + {})", left.to_cypher(), right.to_cypher())
            }
            CypherExpr::FunctionCall { name, args } => format!("{}({})", name, join(args, ", ")),
            CypherExpr::Map(entries) => map_entries(entries),
            CypherExpr::MapProjection { variable, entries } => {
                if entries.is_empty() {
                    return format!("{} {{ }}", variable);
                }
                let body = entries
                    .iter()
                    .map(|entry| match entry {
                        ProjectionEntry::Shorthand(key) => format!(".{}", key),
                        ProjectionEntry::Keyed(key, expr) => {
                            format!("{}: {}", key, expr.to_cypher())
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} {{ {} }}", variable, body)
            }
            CypherExpr::PatternComprehension {
                pattern,
                filter,
                projection,
            } => match filter {
                Some(f) => format!(
                    "[ {} WHERE {} | {} ]",
                    pattern.to_cypher(),
                    f.to_cypher(),
                    projection.to_cypher()
                ),
                None => format!("[ {} | {} ]", pattern.to_cypher(), projection.to_cypher()),
            },
            CypherExpr::ListComprehension {
                variable,
                list,
                filter,
                projection,
            } => {
                let mut out = format!("[{} IN {}", variable, list.to_cypher());
                if let Some(f) = filter {
                    out.push_str(&format!(" WHERE {}", f.to_cypher()));
                }
                if let Some(p) = projection {
                    out.push_str(&format!(" | {}", p.to_cypher()));
                }
                out.push(']');
                out
            }
            CypherExpr::Slice { list, from, to } => format!(
                "{}[{}..{}]",
                list.to_cypher(),
                from.as_ref().map(|f| f.to_cypher()).unwrap_or_default(),
                to.as_ref().map(|t| t.to_cypher()).unwrap_or_default()
            ),
            CypherExpr::Exists { pattern, filter } => match filter {
                Some(f) => format!(
                    "EXISTS {{ MATCH {} WHERE {} }}",
                    pattern.to_cypher(),
                    f.to_cypher()
                ),
                None => format!("EXISTS {{ MATCH {} }}", pattern.to_cypher()),
            },
            CypherExpr::Case {
                when,
                then,
                otherwise,
            } => format!(
                "CASE WHEN {} THEN {} ELSE {} END",
                when.to_cypher(),
                then.to_cypher(),
                otherwise.to_cypher()
            ),
            CypherExpr::Reduce {
                accumulator,
                init,
                variable,
                list,
                expression,
            } => format!(
                "reduce({} = {}, {} IN {} | {})",
                accumulator,
                init.to_cypher(),
                variable,
                list.to_cypher(),
                expression.to_cypher()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher_builder::expr::ComparisonOp;

    fn acted_in(direction: PatternDirection) -> Pattern {
        Pattern::hop(
            NodePattern::bound("this"),
            RelationshipPattern {
                variable: None,
                edge_label: "ACTED_IN".to_string(),
                direction,
            },
            NodePattern::labelled("this_actors", "Actor"),
        )
    }

    #[test]
    fn test_pattern_directions() {
        assert_eq!(
            acted_in(PatternDirection::Left).to_cypher(),
            "(this)<-[:ACTED_IN]-(this_actors:Actor)"
        );
        assert_eq!(
            acted_in(PatternDirection::Right).to_cypher(),
            "(this)-[:ACTED_IN]->(this_actors:Actor)"
        );
        assert_eq!(
            acted_in(PatternDirection::Both).to_cypher(),
            "(this)-[:ACTED_IN]-(this_actors:Actor)"
        );
    }

    #[test]
    fn test_pattern_comprehension_with_filter() {
        let expr = CypherExpr::PatternComprehension {
            pattern: acted_in(PatternDirection::Left),
            filter: Some(Box::new(CypherExpr::compare(
                CypherExpr::property("this_actors", "name"),
                ComparisonOp::Eq,
                CypherExpr::parameter("this_actors_name"),
            ))),
            projection: Box::new(CypherExpr::MapProjection {
                variable: "this_actors".to_string(),
                entries: vec![ProjectionEntry::Keyed(
                    "aliasActorsName".to_string(),
                    CypherExpr::property("this_actors", "name"),
                )],
            }),
        };
        assert_eq!(
            expr.to_cypher(),
            "[ (this)<-[:ACTED_IN]-(this_actors:Actor) WHERE this_actors.name = $this_actors_name | this_actors { aliasActorsName: this_actors.name } ]"
        );
    }

    #[test]
    fn test_nested_boolean_parenthesized() {
        let expr = CypherExpr::And(vec![
            CypherExpr::Or(vec![CypherExpr::parameter("a"), CypherExpr::parameter("b")]),
            CypherExpr::parameter("c"),
        ]);
        assert_eq!(expr.to_cypher(), "($a OR $b) AND $c");
    }

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
    }

    #[test]
    fn test_with_clause_ordering_and_paging() {
        let with = WithClause {
            variables: vec!["this".to_string()],
            order_by: vec![
                OrderByItem {
                    expr: CypherExpr::property("this", "title"),
                    descending: false,
                },
                OrderByItem {
                    expr: CypherExpr::property("this", "year"),
                    descending: true,
                },
            ],
            skip: Some(CypherExpr::parameter("this_offset")),
            limit: Some(CypherExpr::parameter("this_limit")),
        };
        assert_eq!(
            with.to_cypher(),
            "WITH this\nORDER BY this.title ASC, this.year DESC\nSKIP $this_offset\nLIMIT $this_limit"
        );
    }

    #[test]
    fn test_empty_map_and_projection() {
        assert_eq!(CypherExpr::Map(vec![]).to_cypher(), "{ }");
        assert_eq!(
            CypherExpr::MapProjection {
                variable: "this".to_string(),
                entries: vec![]
            }
            .to_cypher(),
            "this { }"
        );
    }
}
