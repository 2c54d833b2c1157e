use super::fields::Field;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Contains => "contains",
        }
    }

    /// Map an operator lexeme; `contains` is matched case-insensitively.
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "=" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Ge),
            "<=" => Some(CompareOp::Le),
            _ if s.eq_ignore_ascii_case("contains") => Some(CompareOp::Contains),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        })
    }
}

/// Parsed query. The only thing the compiler ever sees.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    MatchAll,
    FreeText(Vec<String>),
    Comparison {
        field: Field,
        op: CompareOp,
        value: String,
    },
    PropertyComparison {
        key: String,
        op: CompareOp,
        value: String,
    },
    Logical {
        op: LogicalOp,
        clauses: Vec<QueryNode>,
    },
}

impl QueryNode {
    /// Number of leaf clauses.
    pub fn clause_count(&self) -> usize {
        match self {
            QueryNode::Logical { clauses, .. } => clauses.iter().map(|c| c.clause_count()).sum(),
            _ => 1,
        }
    }
}

/// Canonical rendering: field names in canonical spelling, values and terms
/// quoted. Two queries with the same rendering evaluate identically, which is
/// what makes it usable as a cache key.
impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::MatchAll => f.write_str("*"),
            QueryNode::FreeText(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:?}", term)?;
                }
                Ok(())
            }
            QueryNode::Comparison { field, op, value } => {
                write!(f, "{} {} {:?}", field, op, value)
            }
            QueryNode::PropertyComparison { key, op, value } => {
                write!(f, "Properties : {:?} {} {:?}", key, op, value)
            }
            QueryNode::Logical { op, clauses } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "{}", clause)?;
                }
                Ok(())
            }
        }
    }
}
