//! Query parser built from nom lexeme combinators.
//!
//! Grammar (one logical operator per query, no grouping):
//! - empty input → match everything
//! - `term term ...` → free text, whole-word match on apiName/platformID/environmentID
//! - `field op value` with op in `= != > < >= <= contains`
//! - `Properties : key op value`
//! - clauses joined by `AND` or by `OR` (uppercase keywords)
//!
//! Values run to the end of their clause and keep their source text, so
//! `UpdatedBy = Jane Doe` needs no quotes. Quote a value (`'...'` or `"..."`)
//! to include `AND`/`OR` or operator characters literally.

use super::ast::{CompareOp, LogicalOp, QueryNode};
use super::fields::{Field, FieldResolver};
use crate::error::{ParseError, ParseErrorKind};
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{not, recognize},
    multi::many1_count,
    sequence::{delimited, terminated},
    IResult,
};

const OPERATOR_CHARS: &[char] = &['=', '<', '>', '!', '~'];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Op(CompareOp),
    Colon,
    And,
    Or,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    /// Byte offsets into the original query.
    start: usize,
    end: usize,
}

/// Parses query strings into [`QueryNode`]s, resolving field names through a
/// [`FieldResolver`].
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    resolver: FieldResolver,
}

impl QueryParser {
    pub fn new() -> Self {
        QueryParser {
            resolver: FieldResolver::new(),
        }
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    /// Parse a query string.
    ///
    /// # Errors
    /// Returns a [`ParseError`] carrying the offending substring and its byte
    /// position for unknown operators, unresolvable fields, unterminated
    /// quotes, empty values, malformed `Properties` clauses, empty clauses and
    /// queries mixing `AND` with `OR`.
    pub fn parse(&self, query: &str) -> Result<QueryNode, ParseError> {
        let tokens = lex(query)?;
        if tokens.is_empty() {
            return Ok(QueryNode::MatchAll);
        }

        let mut logical: Option<LogicalOp> = None;
        let mut clauses = Vec::new();
        let mut clause_start = 0;

        for (idx, spanned) in tokens.iter().enumerate() {
            let op = match spanned.token {
                Token::And => LogicalOp::And,
                Token::Or => LogicalOp::Or,
                _ => continue,
            };
            match logical {
                Some(existing) if existing != op => {
                    return Err(ParseError::new(
                        ParseErrorKind::MixedLogicalOperators,
                        op.to_string(),
                        spanned.start,
                    ));
                }
                _ => logical = Some(op),
            }
            if idx == clause_start {
                return Err(ParseError::new(
                    ParseErrorKind::EmptyClause,
                    op.to_string(),
                    spanned.start,
                ));
            }
            clauses.push(self.parse_clause(query, &tokens[clause_start..idx])?);
            clause_start = idx + 1;
        }

        let Some(op) = logical else {
            return self.parse_clause(query, &tokens);
        };
        if clause_start == tokens.len() {
            let last = &tokens[tokens.len() - 1];
            return Err(ParseError::new(
                ParseErrorKind::EmptyClause,
                op.to_string(),
                last.start,
            ));
        }
        clauses.push(self.parse_clause(query, &tokens[clause_start..])?);
        Ok(QueryNode::Logical { op, clauses })
    }

    fn parse_clause(&self, query: &str, toks: &[Spanned]) -> Result<QueryNode, ParseError> {
        // A symbolic operator always wins; `contains` is only the operator when
        // none is present, and never directly after the property colon.
        let symbolic = toks.iter().enumerate().find_map(|(i, t)| match &t.token {
            Token::Op(op) => Some((i, *op)),
            _ => None,
        });
        let op_index = symbolic.or_else(|| {
            toks.iter().enumerate().skip(1).find_map(|(i, t)| match &t.token {
                Token::Word(w)
                    if w.eq_ignore_ascii_case("contains") && toks[i - 1].token != Token::Colon =>
                {
                    Some((i, CompareOp::Contains))
                }
                _ => None,
            })
        });
        let colon_index = toks.iter().position(|t| t.token == Token::Colon);

        let Some((op_idx, op)) = op_index else {
            return self.free_text(query, toks, colon_index);
        };
        let op_token = &toks[op_idx];
        let op_text = &query[op_token.start..op_token.end];

        let node = match colon_index {
            Some(colon_idx) if colon_idx < op_idx => {
                let colon = &toks[colon_idx];
                let (field_text, field_pos) = span_text(query, &toks[..colon_idx]).ok_or_else(
                    || ParseError::new(ParseErrorKind::MissingField, ":", colon.start),
                )?;
                let field = self.resolver.resolve_at(&field_text, field_pos)?;
                if field != Field::Properties {
                    return Err(ParseError::new(
                        ParseErrorKind::MisplacedColon,
                        ":",
                        colon.start,
                    ));
                }
                let (key, _) = span_text(query, &toks[colon_idx + 1..op_idx]).ok_or_else(|| {
                    ParseError::new(ParseErrorKind::EmptyPropertyKey, op_text, op_token.start)
                })?;
                let value = clause_value(query, toks, op_idx)?;
                QueryNode::PropertyComparison {
                    key: key.trim().to_string(),
                    op,
                    value,
                }
            }
            _ => {
                let (field_text, field_pos) = span_text(query, &toks[..op_idx]).ok_or_else(
                    || ParseError::new(ParseErrorKind::MissingField, op_text, op_token.start),
                )?;
                let field = self.resolver.resolve_at(&field_text, field_pos)?;
                if field == Field::Properties {
                    return Err(ParseError::new(
                        ParseErrorKind::EmptyPropertyKey,
                        field_text,
                        field_pos,
                    ));
                }
                let value = clause_value(query, toks, op_idx)?;
                QueryNode::Comparison { field, op, value }
            }
        };
        Ok(node)
    }

    fn free_text(
        &self,
        query: &str,
        toks: &[Spanned],
        colon_index: Option<usize>,
    ) -> Result<QueryNode, ParseError> {
        let first = &toks[0];
        let last = &toks[toks.len() - 1];

        // `Properties : key` without an operator is an incomplete clause, not text
        if let Some(colon_idx) = colon_index {
            if let Some((text, _)) = span_text(query, &toks[..colon_idx]) {
                if matches!(self.resolver.resolve(&text), Ok(Field::Properties)) {
                    let colon = &toks[colon_idx];
                    return Err(ParseError::new(
                        ParseErrorKind::MissingOperator,
                        &query[colon.start..last.end],
                        colon.start,
                    ));
                }
            }
        }

        let terms: Vec<String> = toks
            .iter()
            .filter_map(|t| match &t.token {
                Token::Word(w) => Some(w.clone()),
                Token::Quoted(q) if !q.trim().is_empty() => Some(q.clone()),
                _ => None,
            })
            .collect();

        if terms.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::EmptyClause,
                &query[first.start..last.end],
                first.start,
            ));
        }
        Ok(QueryNode::FreeText(terms))
    }
}

fn clause_value(query: &str, toks: &[Spanned], op_idx: usize) -> Result<String, ParseError> {
    let op_token = &toks[op_idx];
    span_text(query, &toks[op_idx + 1..])
        .map(|(text, _)| text)
        .ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::EmptyValue,
                &query[op_token.start..op_token.end],
                op_token.start,
            )
        })
}

/// Source text covered by `toks`. A lone quoted token yields its contents.
fn span_text(query: &str, toks: &[Spanned]) -> Option<(String, usize)> {
    let first = toks.first()?;
    let last = toks.last()?;
    let text = match (&first.token, toks.len()) {
        (Token::Quoted(inner), 1) => inner.clone(),
        _ => query[first.start..last.end].to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some((text, first.start))
    }
}

fn lex(query: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = query.trim_start();

    while !rest.is_empty() {
        let start = query.len() - rest.len();
        let (remaining, token) = if rest.starts_with(['"', '\'']) {
            match quoted(rest) {
                Ok((r, text)) => (r, Token::Quoted(text.to_string())),
                Err(_) => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedQuote,
                        rest,
                        start,
                    ))
                }
            }
        } else if let Some(r) = rest.strip_prefix(':') {
            (r, Token::Colon)
        } else if is_operator_start(rest) {
            let (r, lexeme) = operator(rest).map_err(|_| {
                ParseError::new(ParseErrorKind::UnknownOperator, &rest[..1], start)
            })?;
            let op = CompareOp::from_symbol(lexeme).ok_or_else(|| {
                ParseError::new(ParseErrorKind::UnknownOperator, lexeme, start)
            })?;
            (r, Token::Op(op))
        } else {
            let (r, text) = word(rest).map_err(|_| {
                let first: String = rest.chars().take(1).collect();
                ParseError::new(ParseErrorKind::UnknownOperator, first, start)
            })?;
            let token = match text {
                "AND" => Token::And,
                "OR" => Token::Or,
                _ => Token::Word(text.to_string()),
            };
            (r, token)
        };

        let end = query.len() - remaining.len();
        tokens.push(Spanned { token, start, end });
        rest = remaining.trim_start();
    }

    Ok(tokens)
}

fn is_operator_start(input: &str) -> bool {
    input.starts_with(['=', '<', '>', '~']) || input.starts_with("!=")
}

fn operator(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| OPERATOR_CHARS.contains(&c))(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    recognize(many1_count(alt((
        satisfy(|c: char| !c.is_whitespace() && c != ':' && !OPERATOR_CHARS.contains(&c)),
        // a lone '!' is text; '!=' starts an operator
        terminated(char('!'), not(char('='))),
    ))))(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(q: &str) -> Result<QueryNode, ParseError> {
        QueryParser::new().parse(q)
    }

    fn cmp(field: Field, op: CompareOp, value: &str) -> QueryNode {
        QueryNode::Comparison {
            field,
            op,
            value: value.to_string(),
        }
    }

    #[test]
    fn empty_is_match_all() {
        assert_eq!(parse("").unwrap(), QueryNode::MatchAll);
        assert_eq!(parse("   \t ").unwrap(), QueryNode::MatchAll);
    }

    #[test]
    fn free_text_terms() {
        assert_eq!(
            parse("user prd").unwrap(),
            QueryNode::FreeText(vec!["user".to_string(), "prd".to_string()])
        );
        assert_eq!(
            parse("\"user auth\"").unwrap(),
            QueryNode::FreeText(vec!["user auth".to_string()])
        );
    }

    #[test]
    fn simple_comparison() {
        assert_eq!(
            parse("Platform = IP4").unwrap(),
            cmp(Field::PlatformId, CompareOp::Eq, "IP4")
        );
        assert_eq!(
            parse("Version>=2.0").unwrap(),
            cmp(Field::Version, CompareOp::Ge, "2.0")
        );
        assert_eq!(
            parse("status != STOPPED").unwrap(),
            cmp(Field::Status, CompareOp::Ne, "STOPPED")
        );
        assert_eq!(
            parse("API Name CONTAINS auth").unwrap(),
            cmp(Field::ApiName, CompareOp::Contains, "auth")
        );
    }

    #[test]
    fn unquoted_value_runs_to_clause_end() {
        assert_eq!(
            parse("UpdatedBy = Jane   Doe").unwrap(),
            cmp(Field::UpdatedBy, CompareOp::Eq, "Jane   Doe")
        );
        assert_eq!(
            parse("UpdatedBy = O'Brien").unwrap(),
            cmp(Field::UpdatedBy, CompareOp::Eq, "O'Brien")
        );
    }

    #[test]
    fn quoted_value_keeps_reserved_words() {
        assert_eq!(
            parse("apiName = 'search AND rescue'").unwrap(),
            cmp(Field::ApiName, CompareOp::Eq, "search AND rescue")
        );
    }

    #[test]
    fn property_comparison() {
        assert_eq!(
            parse("Properties : owner = team-platform").unwrap(),
            QueryNode::PropertyComparison {
                key: "owner".to_string(),
                op: CompareOp::Eq,
                value: "team-platform".to_string(),
            }
        );
        assert_eq!(
            parse("Properties:api.id=42").unwrap(),
            QueryNode::PropertyComparison {
                key: "api.id".to_string(),
                op: CompareOp::Eq,
                value: "42".to_string(),
            }
        );
        assert_eq!(
            parse("Properties : repo = https://git.example.com/x").unwrap(),
            QueryNode::PropertyComparison {
                key: "repo".to_string(),
                op: CompareOp::Eq,
                value: "https://git.example.com/x".to_string(),
            }
        );
    }

    #[test]
    fn logical_and_or() {
        assert_eq!(
            parse("Platform = IP4 AND Environment = prd").unwrap(),
            QueryNode::Logical {
                op: LogicalOp::And,
                clauses: vec![
                    cmp(Field::PlatformId, CompareOp::Eq, "IP4"),
                    cmp(Field::EnvironmentId, CompareOp::Eq, "prd"),
                ],
            }
        );
        let or = parse("Status = RUNNING OR Status = DEPLOYING OR user").unwrap();
        match or {
            QueryNode::Logical { op, clauses } => {
                assert_eq!(op, LogicalOp::Or);
                assert_eq!(clauses.len(), 3);
                assert_eq!(clauses[2], QueryNode::FreeText(vec!["user".to_string()]));
            }
            other => panic!("Expected Logical, got {:?}", other),
        }
    }

    #[test]
    fn lowercase_keywords_are_text() {
        assert_eq!(
            parse("salt and pepper").unwrap(),
            QueryNode::FreeText(vec![
                "salt".to_string(),
                "and".to_string(),
                "pepper".to_string()
            ])
        );
    }

    #[test]
    fn mixed_logical_operators_rejected() {
        let err = parse("Status = RUNNING AND Platform = IP4 OR Environment = prd").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MixedLogicalOperators);
        assert_eq!(err.token, "OR");
        assert_eq!(err.position, 36);
    }

    #[test]
    fn unknown_operator_reports_position() {
        let err = parse("Status == RUNNING").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownOperator);
        assert_eq!(err.token, "==");
        assert_eq!(err.position, 7);

        let err = parse("Version => 2").unwrap_err();
        assert_eq!(err.token, "=>");
        assert_eq!(parse("Status <> x").unwrap_err().token, "<>");
    }

    #[test]
    fn unknown_field() {
        let err = parse("Colour = blue").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownField);
        assert_eq!(err.token, "Colour");
        assert_eq!(err.position, 0);
    }

    #[test]
    fn unterminated_quote() {
        let err = parse("apiName = \"user-auth").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedQuote);
        assert_eq!(err.position, 10);
        assert_eq!(err.token, "\"user-auth");
    }

    #[test]
    fn empty_value() {
        let err = parse("Status =").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyValue);
        assert_eq!(err.token, "=");
        assert_eq!(err.position, 7);

        let err = parse("Status = \"\"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyValue);
    }

    #[test]
    fn malformed_clauses() {
        assert_eq!(
            parse("= RUNNING").unwrap_err().kind,
            ParseErrorKind::MissingField
        );
        assert_eq!(
            parse("Status : x = y").unwrap_err().kind,
            ParseErrorKind::MisplacedColon
        );
        assert_eq!(
            parse("Properties : owner").unwrap_err().kind,
            ParseErrorKind::MissingOperator
        );
        assert_eq!(
            parse("Properties : = x").unwrap_err().kind,
            ParseErrorKind::EmptyPropertyKey
        );
        assert_eq!(
            parse("Properties = x").unwrap_err().kind,
            ParseErrorKind::EmptyPropertyKey
        );
        assert_eq!(
            parse("AND Status = x").unwrap_err().kind,
            ParseErrorKind::EmptyClause
        );
        assert_eq!(
            parse("Status = x AND").unwrap_err().kind,
            ParseErrorKind::EmptyClause
        );
    }

    #[test]
    fn canonical_rendering_normalizes_spelling() {
        let a = parse("platform=IP4   AND  env = prd").unwrap();
        let b = parse("PlatformID = IP4 AND Environment = prd").unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "platformID = \"IP4\" AND environmentID = \"prd\"");
    }

    #[test]
    fn symbolic_operator_beats_contains_keyword() {
        assert_eq!(
            parse("Properties : contains = x").unwrap(),
            QueryNode::PropertyComparison {
                key: "contains".to_string(),
                op: CompareOp::Eq,
                value: "x".to_string(),
            }
        );
        assert_eq!(
            parse("Properties : contains contains beta").unwrap(),
            QueryNode::PropertyComparison {
                key: "contains".to_string(),
                op: CompareOp::Contains,
                value: "beta".to_string(),
            }
        );
        assert_eq!(
            parse("Version contains 2.").unwrap(),
            cmp(Field::Version, CompareOp::Contains, "2.")
        );
        assert_eq!(
            parse("API Name contains = x").unwrap_err().kind,
            ParseErrorKind::UnknownField
        );
    }
}
