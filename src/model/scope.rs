//! Table and column names, and the FROM clause each column is read from.
//!
//! A nested aggregation subject becomes a subquery, so its columns are
//! looked up in its own tables before those of the enclosing query:
//!
//! ```text
//! sujet.tables [a, b] ───────────────▶ scope [a, b]
//!   └─ {"agg", "subject": {tables [c]}} ▶ scope [c, a, b]
//! ```

use super::{Aggregation, ColumnKind, Condition, Expression, IndicatorSpec};

/// Receives every table and column name of an indicator.
pub trait NameVisitor {
    /// A table of a subject, main or nested.
    fn table(&mut self, _name: &mut String) {}

    /// A column reference, with the tables it is evaluated against,
    /// innermost FROM clause first.
    fn column(&mut self, _scope: &[String], _name: &mut String) {}
}

/// The column names read within one FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Tables of the FROM clause, then those of enclosing queries.
    pub tables: Vec<String>,
    pub columns: Vec<String>,
}

impl IndicatorSpec {
    /// Walk every name. Columns are visited before the tables of their
    /// scope, so scopes always carry the original table names.
    pub fn visit_names<V: NameVisitor>(&mut self, visitor: &mut V) {
        let scope = self.subject.tables.clone();
        self.subject.conditions.visit_names(&scope, visitor);
        for column in &mut self.columns {
            match &mut column.kind {
                ColumnKind::GroupBy(expr) | ColumnKind::Aggregation(expr) => {
                    expr.visit_names(&scope, visitor)
                }
                ColumnKind::Case(arms) => {
                    for arm in arms {
                        arm.when.visit_names(&scope, visitor);
                    }
                }
            }
        }
        for table in &mut self.subject.tables {
            visitor.table(table);
        }
    }

    /// Column references grouped by scope, in first-seen order.
    pub fn scopes(&self) -> Vec<Scope> {
        let mut collector = ScopeCollector::default();
        self.clone().visit_names(&mut collector);
        collector.scopes
    }
}

impl Expression {
    fn visit_names<V: NameVisitor>(&mut self, scope: &[String], visitor: &mut V) {
        match self {
            Expression::Literal(_) => {}
            Expression::Column(name) => visitor.column(scope, name),
            Expression::Operator { args, .. } => {
                for arg in args {
                    arg.visit_names(scope, visitor);
                }
            }
            Expression::Aggregate(agg) => agg.visit_names(scope, visitor),
        }
    }
}

impl Aggregation {
    fn visit_names<V: NameVisitor>(&mut self, outer: &[String], visitor: &mut V) {
        let Some(subject) = &mut self.subject else {
            self.condition.visit_names(outer, visitor);
            if let Some(column) = &mut self.column {
                visitor.column(outer, column);
            }
            return;
        };

        let scope: Vec<String> = subject.tables.iter().chain(outer).cloned().collect();
        subject.conditions.visit_names(&scope, visitor);
        self.condition.visit_names(&scope, visitor);
        if let Some(column) = &mut self.column {
            visitor.column(&scope, column);
        }
        for table in &mut subject.tables {
            visitor.table(table);
        }
    }
}

impl Condition {
    fn visit_names<V: NameVisitor>(&mut self, scope: &[String], visitor: &mut V) {
        match self {
            Condition::Empty => {}
            Condition::All(children) | Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.visit_names(scope, visitor);
                }
            }
            Condition::Compare { left, right, .. } => {
                left.visit_names(scope, visitor);
                right.visit_names(scope, visitor);
            }
        }
    }
}

#[derive(Default)]
struct ScopeCollector {
    scopes: Vec<Scope>,
}

impl NameVisitor for ScopeCollector {
    fn column(&mut self, scope: &[String], name: &mut String) {
        let index = match self.scopes.iter().position(|s| s.tables == scope) {
            Some(index) => index,
            None => {
                self.scopes.push(Scope {
                    tables: scope.to_vec(),
                    columns: vec![],
                });
                self.scopes.len() - 1
            }
        };
        let columns = &mut self.scopes[index].columns;
        if !columns.contains(name) {
            columns.push(name.clone());
        }
    }
}
