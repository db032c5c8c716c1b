/// Aggregation operator registry
///
/// Maps the operator names an aggregate selection may request (`min`, `average`,
/// `shortest`, ...) to the scalar kinds they accept and the Cypher they compile to.
use std::collections::HashMap;

use super::expr::{ComparisonOp, CypherExpr};
use crate::graph_catalog::ScalarKind;

/// Registry entry for one aggregation operator
#[derive(Clone)]
pub struct AggregationOp {
    /// Operator name as selected
    pub name: &'static str,
    /// Whether the operator is defined for fields of this kind
    pub accepts: fn(ScalarKind) -> bool,
    /// Builds the aggregate expression over the property expression
    pub build: fn(CypherExpr) -> CypherExpr,
}

pub fn get_aggregation_op(name: &str) -> Option<AggregationOp> {
    AGGREGATION_OPS.get(name).cloned()
}

/// Operators valid for `kind`, sorted by name
pub fn ops_for_kind(kind: ScalarKind) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = AGGREGATION_OPS
        .values()
        .filter(|op| (op.accepts)(kind))
        .map(|op| op.name)
        .collect();
    names.sort_unstable();
    names
}

fn orderable(kind: ScalarKind) -> bool {
    kind.is_numeric() || matches!(kind, ScalarKind::Temporal(_))
}

/// `reduce(acc = head(collect(p)), current IN collect(p) | CASE WHEN size(current) <op> size(acc) THEN current ELSE acc END)`
fn by_length(property: CypherExpr, op: ComparisonOp, accumulator: &str) -> CypherExpr {
    let collected = CypherExpr::call("collect", vec![property]);
    CypherExpr::Reduce {
        accumulator: accumulator.to_string(),
        init: Box::new(CypherExpr::call("head", vec![collected.clone()])),
        variable: "current".to_string(),
        list: Box::new(collected),
        expression: Box::new(CypherExpr::Case {
            when: Box::new(CypherExpr::compare(
                CypherExpr::call("size", vec![CypherExpr::variable("current")]),
                op,
                CypherExpr::call("size", vec![CypherExpr::variable(accumulator)]),
            )),
            then: Box::new(CypherExpr::variable("current")),
            otherwise: Box::new(CypherExpr::variable(accumulator)),
        }),
    }
}

lazy_static::lazy_static! {
    static ref AGGREGATION_OPS: HashMap<&'static str, AggregationOp> = {
        let mut m = HashMap::new();

        m.insert("min", AggregationOp {
            name: "min",
            accepts: orderable,
            build: |p| CypherExpr::call("min", vec![p]),
        });

        m.insert("max", AggregationOp {
            name: "max",
            accepts: orderable,
            build: |p| CypherExpr::call("max", vec![p]),
        });

        m.insert("average", AggregationOp {
            name: "average",
            accepts: |k| k.is_numeric(),
            build: |p| CypherExpr::call("avg", vec![p]),
        });

        m.insert("sum", AggregationOp {
            name: "sum",
            accepts: |k| k.is_numeric(),
            build: |p| CypherExpr::call("sum", vec![p]),
        });

        m.insert("shortest", AggregationOp {
            name: "shortest",
            accepts: |k| k.is_textual(),
            build: |p| by_length(p, ComparisonOp::Lt, "shortest"),
        });

        m.insert("longest", AggregationOp {
            name: "longest",
            accepts: |k| k.is_textual(),
            build: |p| by_length(p, ComparisonOp::Gt, "longest"),
        });

        m
    };
}
