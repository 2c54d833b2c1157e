use super::ast::{CompareOp, LogicalOp, QueryNode};
use super::compare::{lookup_property, property_matches, text_matches, timestamp_matches};
use super::fields::{Field, FieldKind};
use crate::error::{ApiTrackError, Result};
use crate::types::{Row, SearchOptions};
use regex::{Regex, RegexBuilder};

/// Compiled query: a pure function over flattened rows.
pub type RowPredicate = Box<dyn Fn(&Row) -> bool + Send + Sync>;

/// Turns a [`QueryNode`] into a [`RowPredicate`].
///
/// Everything that can fail (regex construction, clause limits) fails here,
/// so the resulting predicate never errors while scanning.
pub struct PipelineCompiler {
    options: SearchOptions,
}

impl PipelineCompiler {
    const MAX_CLAUSES: usize = 1000;

    pub fn new(options: SearchOptions) -> Self {
        PipelineCompiler { options }
    }

    pub fn compile(&self, node: &QueryNode) -> Result<RowPredicate> {
        let clause_count = node.clause_count();
        if clause_count > Self::MAX_CLAUSES {
            return Err(ApiTrackError::InvalidQuery(format!(
                "Query has {} clauses, exceeds maximum {}",
                clause_count,
                Self::MAX_CLAUSES
            )));
        }
        self.compile_node(node)
    }

    fn compile_node(&self, node: &QueryNode) -> Result<RowPredicate> {
        match node {
            QueryNode::MatchAll => Ok(Box::new(|_: &Row| true)),
            QueryNode::FreeText(terms) => self.compile_free_text(terms),
            QueryNode::Comparison { field, op, value } => {
                Ok(self.compile_comparison(*field, *op, value.clone()))
            }
            QueryNode::PropertyComparison { key, op, value } => {
                let (key, op, value) = (key.clone(), *op, value.clone());
                let case_sensitive = self.options.case_sensitive;
                Ok(Box::new(move |row: &Row| {
                    lookup_property(&row.properties, &key)
                        .map(|v| property_matches(v, op, &value, case_sensitive))
                        .unwrap_or(false)
                }))
            }
            QueryNode::Logical { op, clauses } => {
                let compiled = clauses
                    .iter()
                    .map(|c| self.compile_node(c))
                    .collect::<Result<Vec<_>>>()?;
                let predicate: RowPredicate = match op {
                    LogicalOp::And => Box::new(move |row: &Row| compiled.iter().all(|p| p(row))),
                    LogicalOp::Or => Box::new(move |row: &Row| compiled.iter().any(|p| p(row))),
                };
                Ok(predicate)
            }
        }
    }

    fn compile_free_text(&self, terms: &[String]) -> Result<RowPredicate> {
        let patterns = terms
            .iter()
            .map(|term| self.word_regex(term))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(move |row: &Row| {
            patterns.iter().all(|re| {
                re.is_match(&row.api_name)
                    || re.is_match(row.platform_id.as_str())
                    || re.is_match(row.environment_id.as_str())
            })
        }))
    }

    /// Whole-word pattern for a free-text term. Boundaries are only anchored
    /// on edges that are word characters, otherwise `\b` could never match.
    fn word_regex(&self, term: &str) -> Result<Regex> {
        let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        let lead = if is_word(term.chars().next()) { r"\b" } else { "" };
        let trail = if is_word(term.chars().last()) { r"\b" } else { "" };
        let pattern = format!("{}{}{}", lead, regex::escape(term), trail);
        RegexBuilder::new(&pattern)
            .case_insensitive(!self.options.case_sensitive)
            .build()
            .map_err(|e| ApiTrackError::InvalidQuery(format!("Invalid search term '{}': {}", term, e)))
    }

    fn compile_comparison(&self, field: Field, op: CompareOp, value: String) -> RowPredicate {
        let case_sensitive = match field.kind() {
            FieldKind::Discrete => false,
            _ => self.options.case_sensitive,
        };
        match field {
            Field::ApiName => {
                Box::new(move |row: &Row| text_matches(&row.api_name, op, &value, case_sensitive))
            }
            Field::PlatformId => Box::new(move |row: &Row| {
                text_matches(row.platform_id.as_str(), op, &value, case_sensitive)
            }),
            Field::EnvironmentId => Box::new(move |row: &Row| {
                text_matches(row.environment_id.as_str(), op, &value, case_sensitive)
            }),
            Field::Status => Box::new(move |row: &Row| {
                text_matches(row.status.as_str(), op, &value, case_sensitive)
            }),
            Field::Version => {
                Box::new(move |row: &Row| text_matches(&row.version, op, &value, case_sensitive))
            }
            Field::UpdatedBy => {
                Box::new(move |row: &Row| text_matches(&row.updated_by, op, &value, case_sensitive))
            }
            Field::LastUpdated => {
                Box::new(move |row: &Row| timestamp_matches(row.last_updated, op, &value))
            }
            Field::DeploymentDate => {
                Box::new(move |row: &Row| timestamp_matches(row.deployment_date, op, &value))
            }
            // The parser only produces Properties as PropertyComparison
            Field::Properties => Box::new(|_: &Row| false),
        }
    }
}
