//! Filter model: terms, criteria, and the combined filter set.
//!
//! A [`FilterSet`] is built once from user input before any chunk is
//! processed and is read-only afterwards, so it can be shared freely across
//! worker threads. Evaluation lives in [`eval`].

pub mod eval;

/// Sentinel keyword matching records where the field is missing or blank.
pub const EMPTY_SENTINEL: &str = "=EMPTY";
/// Sentinel keyword matching records where the field is present and non-blank.
pub const NOT_EMPTY_SENTINEL: &str = "!=EMPTY";

/// Comparison operator for numeric terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CmpOp {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
        }
    }
}

/// One keyword, parsed into its semantic kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// `=EMPTY` — field missing, or present but blank.
    Empty,
    /// `!=EMPTY` — field present and non-blank. This is an atomic sentinel,
    /// not a negated `Empty`.
    NotEmpty,
    /// `>10`, `<=2.5`, `=3`, bare `42` — numeric comparison against a
    /// numeric source value. Non-numeric sources never match.
    Numeric { op: CmpOp, rhs: f64 },
    /// Case-insensitive substring, optionally negated by a `!` prefix.
    Substring { needle: String, negated: bool },
}

impl Term {
    /// Parse one keyword string into a term.
    ///
    /// Order matters: the EMPTY sentinels are checked first (so `!=EMPTY`
    /// is never read as a negation), then a `!` prefix is stripped, then the
    /// remainder is tried as a numeric comparison, else it is a substring.
    /// A `!` prefix on a numeric body is ignored — negation is not
    /// meaningful for comparisons, which already have a `<`/`>` vocabulary.
    pub fn parse(raw: &str) -> Term {
        let raw = raw.trim();
        if raw == EMPTY_SENTINEL {
            return Term::Empty;
        }
        if raw == NOT_EMPTY_SENTINEL {
            return Term::NotEmpty;
        }
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, raw),
        };
        if let Some((op, rhs)) = parse_numeric(body) {
            return Term::Numeric { op, rhs };
        }
        Term::Substring {
            needle: body.to_lowercase(),
            negated,
        }
    }
}

/// Try to read `<op><number>` (operator optional, defaulting to `=`).
fn parse_numeric(body: &str) -> Option<(CmpOp, f64)> {
    let (op, rest) = if let Some(r) = body.strip_prefix("<=") {
        (CmpOp::Le, r)
    } else if let Some(r) = body.strip_prefix(">=") {
        (CmpOp::Ge, r)
    } else if let Some(r) = body.strip_prefix('<') {
        (CmpOp::Lt, r)
    } else if let Some(r) = body.strip_prefix('>') {
        (CmpOp::Gt, r)
    } else if let Some(r) = body.strip_prefix('=') {
        (CmpOp::Eq, r)
    } else {
        (CmpOp::Eq, body)
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    rest.parse::<f64>().ok().map(|n| (op, n))
}

/// AND/OR combination mode, used both for terms within a criterion and for
/// criteria within a filter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// One filter criterion: which field to read and which terms to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriterion {
    /// Flattened field path or wildcard; `None` searches the raw line text.
    pub selector: Option<String>,
    pub terms: Vec<Term>,
    pub term_mode: MatchMode,
}

impl FilterCriterion {
    /// Build a criterion from a selector and a comma-separated keyword list.
    pub fn new(selector: Option<&str>, keywords: &str, term_mode: MatchMode) -> FilterCriterion {
        let terms = keywords
            .split(',')
            .map(str::trim)
            .filter(|kw| !kw.is_empty())
            .map(Term::parse)
            .collect();
        FilterCriterion {
            selector: selector.map(|s| s.trim().to_string()),
            terms,
            term_mode,
        }
    }
}

/// The full per-record decision: an ordered list of criteria plus the mode
/// combining their results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub criteria: Vec<FilterCriterion>,
    pub criteria_mode: MatchMode,
}

impl FilterSet {
    pub fn new(criteria: Vec<FilterCriterion>, criteria_mode: MatchMode) -> FilterSet {
        FilterSet {
            criteria,
            criteria_mode,
        }
    }

    /// A filter with no criteria matches every record (pass-through).
    pub fn is_pass_through(&self) -> bool {
        self.criteria.is_empty()
    }
}
