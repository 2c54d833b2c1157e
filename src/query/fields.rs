use crate::error::{ParseError, ParseErrorKind};
use std::fmt;

/// Canonical row fields a query can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ApiName,
    PlatformId,
    EnvironmentId,
    Version,
    Status,
    LastUpdated,
    DeploymentDate,
    UpdatedBy,
    /// Namespace prefix for `Properties : key op value` clauses.
    Properties,
}

/// How a field's values compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Closed value set; equality is always case-insensitive.
    Discrete,
    /// Arbitrary text; case sensitivity is a per-call option.
    FreeValued,
    Timestamp,
    Namespace,
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::ApiName,
        Field::PlatformId,
        Field::EnvironmentId,
        Field::Version,
        Field::Status,
        Field::LastUpdated,
        Field::DeploymentDate,
        Field::UpdatedBy,
        Field::Properties,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            Field::ApiName => "apiName",
            Field::PlatformId => "platformID",
            Field::EnvironmentId => "environmentID",
            Field::Version => "version",
            Field::Status => "status",
            Field::LastUpdated => "lastUpdated",
            Field::DeploymentDate => "deploymentDate",
            Field::UpdatedBy => "updatedBy",
            Field::Properties => "Properties",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::PlatformId | Field::EnvironmentId | Field::Status => FieldKind::Discrete,
            Field::ApiName | Field::Version | Field::UpdatedBy => FieldKind::FreeValued,
            Field::LastUpdated | Field::DeploymentDate => FieldKind::Timestamp,
            Field::Properties => FieldKind::Namespace,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Normalized spellings accepted for each field.
const ALIASES: &[(&str, Field)] = &[
    ("apiname", Field::ApiName),
    ("api", Field::ApiName),
    ("name", Field::ApiName),
    ("platformid", Field::PlatformId),
    ("platform", Field::PlatformId),
    ("environmentid", Field::EnvironmentId),
    ("environment", Field::EnvironmentId),
    ("env", Field::EnvironmentId),
    ("version", Field::Version),
    ("status", Field::Status),
    ("lastupdated", Field::LastUpdated),
    ("deploymentdate", Field::DeploymentDate),
    ("updatedby", Field::UpdatedBy),
    ("properties", Field::Properties),
    ("props", Field::Properties),
];

/// Maps user-typed field names onto [`Field`]s.
///
/// Matching is case-insensitive and ignores whitespace, `_` and `-`, so
/// `API Name`, `api_name` and `apiName` are the same field. Small typos are
/// tolerated: the allowed Damerau-Levenshtein distance grows with the length
/// of the typed name and never exceeds [`FieldResolver::MAX_TYPOS`]. Equal
/// distances go to the lexically smaller canonical name. Names outside the
/// budget are rejected, never guessed.
#[derive(Debug, Clone, Default)]
pub struct FieldResolver;

impl FieldResolver {
    pub const MAX_TYPOS: usize = 2;

    pub fn new() -> Self {
        FieldResolver
    }

    pub fn resolve(&self, raw: &str) -> Result<Field, ParseError> {
        self.resolve_at(raw, 0)
    }

    /// Like [`FieldResolver::resolve`], reporting `position` on failure.
    pub fn resolve_at(&self, raw: &str, position: usize) -> Result<Field, ParseError> {
        let normalized = normalize(raw);
        let unknown = || ParseError::new(ParseErrorKind::UnknownField, raw.trim(), position);
        if normalized.is_empty() {
            return Err(unknown());
        }

        if let Some((_, field)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
            return Ok(*field);
        }

        let budget = Self::typo_budget(&normalized);
        if budget == 0 {
            return Err(unknown());
        }

        let best = ALIASES
            .iter()
            .map(|(alias, field)| (strsim::damerau_levenshtein(&normalized, alias), *field))
            .filter(|(distance, _)| *distance <= budget)
            .min_by(|(da, fa), (db, fb)| {
                da.cmp(db)
                    .then_with(|| fa.canonical_name().cmp(fb.canonical_name()))
            });

        match best {
            Some((distance, field)) => {
                tracing::debug!(
                    "[FIELDS] resolved '{}' to {} (distance {})",
                    raw.trim(),
                    field,
                    distance
                );
                Ok(field)
            }
            None => Err(unknown()),
        }
    }

    fn typo_budget(normalized: &str) -> usize {
        let len = normalized.chars().count();
        if len <= 3 {
            0
        } else if len <= 5 {
            1
        } else {
            Self::MAX_TYPOS
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
