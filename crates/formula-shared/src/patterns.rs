//! Static phrase -> formula templates.
//!
//! This is the tier that always answers. A description is normalized
//! (trimmed, lower-cased) and matched against the table:
//!
//! 1. exact phrase match
//! 2. first phrase, in declaration order, that is a substring of the description
//! 3. `=AVERAGE(range)`
//!
//! Step 2 is first-match-wins, so a phrase must be declared before every
//! shorter phrase contained in it ("moving average" before "average").
//! [`PatternTable::shadowed_phrases`] reports violations of that ordering.
//!
//! Aliases are flattened when the table is built; an unknown target or a
//! cycle is a construction error.

use crate::error::PatternError;
use std::collections::HashMap;
use std::fmt;

/// Builds formula text for a target range.
pub type Template = fn(&str) -> String;

/// Right-hand side of a declaration.
#[derive(Clone)]
pub enum PatternBody {
    Formula(Template),
    Alias(String),
}

/// One declared row of the table, before alias resolution.
#[derive(Debug, Clone)]
pub struct PatternDecl {
    pub phrase: String,
    pub body: PatternBody,
}

impl PatternDecl {
    pub fn formula(phrase: &str, template: Template) -> Self {
        Self {
            phrase: phrase.to_string(),
            body: PatternBody::Formula(template),
        }
    }

    pub fn alias(phrase: &str, target: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            body: PatternBody::Alias(target.to_string()),
        }
    }
}

/// A resolved row: phrase plus a concrete template.
#[derive(Clone)]
pub struct PatternEntry {
    pub phrase: String,
    pub template: Template,
}

impl fmt::Debug for PatternBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternBody::Formula(_) => f.write_str("Formula(..)"),
            PatternBody::Alias(target) => f.debug_tuple("Alias").field(target).finish(),
        }
    }
}

impl fmt::Debug for PatternEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternEntry")
            .field("phrase", &self.phrase)
            .finish_non_exhaustive()
    }
}

/// Immutable, ordered pattern table shared by all requests.
#[derive(Debug, Clone)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
    exact: HashMap<String, usize>,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Formula used when nothing in the table matches.
pub fn default_formula(range: &str) -> String {
    format!("=AVERAGE({})", range)
}

impl PatternTable {
    /// Builds a table from declarations, keeping their order.
    pub fn build(decls: Vec<PatternDecl>) -> Result<Self, PatternError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(decls.len());
        let mut normalized = Vec::with_capacity(decls.len());

        for (i, decl) in decls.iter().enumerate() {
            let phrase = normalize(&decl.phrase);
            if phrase.is_empty() {
                return Err(PatternError::EmptyPhrase);
            }
            if index.insert(phrase.clone(), i).is_some() {
                return Err(PatternError::DuplicatePhrase(phrase));
            }
            normalized.push(phrase);
        }

        let mut entries = Vec::with_capacity(decls.len());
        for (i, phrase) in normalized.iter().enumerate() {
            let template = resolve_alias(i, &decls, &normalized, &index)?;
            entries.push(PatternEntry {
                phrase: phrase.clone(),
                template,
            });
        }

        Ok(Self {
            entries,
            exact: index,
        })
    }

    /// The built-in table.
    pub fn builtin() -> Result<Self, PatternError> {
        Self::build(builtin_declarations())
    }

    /// Finds the entry for a description: exact match first, then the first
    /// declared phrase contained in it.
    pub fn lookup(&self, description: &str) -> Option<&PatternEntry> {
        let normalized = normalize(description);

        if let Some(&i) = self.exact.get(&normalized) {
            return Some(&self.entries[i]);
        }

        self.entries
            .iter()
            .find(|entry| normalized.contains(entry.phrase.as_str()))
    }

    /// Resolves a description to formula text. Never fails.
    pub fn resolve(&self, description: &str, range: &str) -> String {
        match self.lookup(description) {
            Some(entry) => (entry.template)(range),
            None => default_formula(range),
        }
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs `(earlier, later)` where the earlier phrase is contained in the
    /// later one, so the later phrase can only ever be reached by exact match.
    pub fn shadowed_phrases(&self) -> Vec<(String, String)> {
        let mut shadowed = Vec::new();
        for (i, earlier) in self.entries.iter().enumerate() {
            for later in &self.entries[i + 1..] {
                if later.phrase.contains(earlier.phrase.as_str()) {
                    shadowed.push((earlier.phrase.clone(), later.phrase.clone()));
                }
            }
        }
        shadowed
    }
}

fn resolve_alias(
    start: usize,
    decls: &[PatternDecl],
    normalized: &[String],
    index: &HashMap<String, usize>,
) -> Result<Template, PatternError> {
    let mut chain = vec![normalized[start].clone()];
    let mut current = start;

    loop {
        match &decls[current].body {
            PatternBody::Formula(template) => return Ok(*template),
            PatternBody::Alias(target) => {
                let target = normalize(target);
                let next = *index.get(&target).ok_or_else(|| PatternError::UnknownAlias {
                    phrase: normalized[current].clone(),
                    target: target.clone(),
                })?;
                if chain.contains(&target) {
                    chain.push(target);
                    return Err(PatternError::AliasCycle(chain));
                }
                chain.push(target);
                current = next;
            }
        }
    }
}

// ============================================================================
// Template helpers
// ============================================================================

fn moving_average(range: &str, window: usize) -> String {
    format!(
        "=AVERAGE(OFFSET({r},ROW()-ROW({r})-{back},0,{w},1))",
        r = range,
        back = window - 1,
        w = window
    )
}

fn percentile(range: &str, p: &str) -> String {
    format!("=PERCENTILE({}, {})", range, p)
}

// ============================================================================
// Built-in declarations
// ============================================================================

/// Built-in declarations.
///
/// Group order decides fuzzy ties between unrelated phrases and is kept
/// stable. Within it, a phrase is only moved forward when it contains a
/// phrase that would otherwise shadow it.
pub fn builtin_declarations() -> Vec<PatternDecl> {
    use PatternDecl as P;

    vec![
        // Financial growth
        P::formula("cagr", |r| {
            format!("=POWER(INDEX({r},ROWS({r}))/INDEX({r},1),1/(ROWS({r})-1))-1")
        }),
        P::alias("compound annual growth rate", "cagr"),
        P::alias("compound growth", "cagr"),
        P::alias("annual growth rate", "cagr"),
        P::formula("total growth percentage", |r| {
            format!("=(INDEX({r},ROWS({r}))/INDEX({r},1)-1)*100")
        }),
        P::formula("total growth", |r| {
            format!("=(INDEX({r},ROWS({r}))/INDEX({r},1))-1")
        }),
        P::alias("growth percentage", "total growth percentage"),
        P::formula("average growth", |r| {
            format!("=AVERAGE(ARRAYFORMULA({r}/OFFSET({r},1,0,ROWS({r})-1,1)-1))")
        }),
        P::alias("average annual growth", "average growth"),
        // Phrases containing "average"
        P::formula("moving average 3", |r| moving_average(r, 3)),
        P::formula("moving average 5", |r| moving_average(r, 5)),
        P::formula("moving average 7", |r| moving_average(r, 7)),
        P::formula("exponential moving average", |r| format!("=EMA({}, 0.3)", r)),
        P::alias("moving average", "moving average 5"),
        P::formula("average if greater than zero", |r| {
            format!("=AVERAGEIF({},\">0\")", r)
        }),
        P::alias("average positive", "average if greater than zero"),
        P::formula("average if less than zero", |r| format!("=AVERAGEIF({},\"<0\")", r)),
        P::alias("average negative", "average if less than zero"),
        P::formula("average excluding zeros", |r| format!("=AVERAGEIF({},\"<>0\")", r)),
        P::alias("average ignoring zeros", "average excluding zeros"),
        P::alias("average non-zero", "average excluding zeros"),
        // Descriptive statistics
        P::formula("average", default_formula),
        P::alias("mean", "average"),
        P::formula("median", |r| format!("=MEDIAN({})", r)),
        P::formula("standard deviation", |r| format!("=STDEV({})", r)),
        P::alias("stdev", "standard deviation"),
        P::alias("std dev", "standard deviation"),
        P::formula("variance", |r| format!("=VAR({})", r)),
        P::alias("var", "variance"),
        P::formula("correlation", |r| format!("=CORREL({})", r)),
        P::alias("correl", "correlation"),
        P::formula("90th percentile", |r| percentile(r, "0.9")),
        P::formula("75th percentile", |r| percentile(r, "0.75")),
        P::formula("50th percentile", |r| percentile(r, "0.5")),
        P::formula("25th percentile", |r| percentile(r, "0.25")),
        P::formula("10th percentile", |r| percentile(r, "0.1")),
        P::alias("percentile", "90th percentile"),
        // Time series
        P::alias("ma 3", "moving average 3"),
        P::alias("ma 5", "moving average 5"),
        P::alias("ma 7", "moving average 7"),
        P::alias("ema", "exponential moving average"),
        P::alias("linear forecast", "forecast"),
        P::formula("forecast", |r| format!("=FORECAST(ROWS({r})+1,ROW({r}),{r})")),
        P::alias("linear trend", "trend"),
        P::formula("trend", |r| format!("=TREND({r},ROW({r}),ROW({r})+1)")),
        // Basic aggregates, conditional sums first
        P::formula("sum excluding zeros", |r| format!("=SUMIF({},\"<>0\")", r)),
        P::alias("sum ignoring zeros", "sum excluding zeros"),
        P::alias("sum non-zero", "sum excluding zeros"),
        P::formula("sum if greater than zero", |r| format!("=SUMIF({},\">0\")", r)),
        P::alias("sum positive", "sum if greater than zero"),
        P::formula("sum if less than zero", |r| format!("=SUMIF({},\"<0\")", r)),
        P::alias("sum negative", "sum if less than zero"),
        P::formula("sum", |r| format!("=SUM({})", r)),
        P::alias("total", "sum"),
        P::alias("add", "sum"),
        P::formula("product", |r| format!("=PRODUCT({})", r)),
        P::alias("multiply", "product"),
        P::formula("minimum", |r| format!("=MIN({})", r)),
        P::alias("min", "minimum"),
        P::alias("smallest", "minimum"),
        P::formula("maximum", |r| format!("=MAX({})", r)),
        P::alias("max", "maximum"),
        P::alias("largest", "maximum"),
        // Counting, every "count ..." phrase before bare "count"
        P::formula("count values", |r| format!("=COUNT({})", r)),
        P::formula("count non-empty cells", |r| format!("=COUNTA({})", r)),
        P::alias("count non-empty", "count non-empty cells"),
        P::alias("count all", "count non-empty cells"),
        P::formula("count empty cells", |r| format!("=COUNTBLANK({})", r)),
        P::alias("count empty", "count empty cells"),
        P::alias("count blanks", "count empty cells"),
        P::formula("count if greater than zero", |r| format!("=COUNTIF({},\">0\")", r)),
        P::alias("count positive", "count if greater than zero"),
        P::formula("count if less than zero", |r| format!("=COUNTIF({},\"<0\")", r)),
        P::alias("count negative", "count if less than zero"),
        P::alias("count", "count values"),
        // Declared late so "average growth rate" and friends match their statistic
        P::alias("growth rate", "total growth"),
        // Text
        P::formula("concatenate", |r| format!("=CONCATENATE({})", r)),
        P::alias("join text", "concatenate"),
        P::formula("trim whitespace", |r| format!("=TRIM({})", r)),
        P::alias("clean text", "trim whitespace"),
        // Lookup
        P::formula("vlookup", |r| format!("=VLOOKUP(\"search_key\", {}, 2, FALSE)", r)),
        P::alias("vertical lookup", "vlookup"),
        // Date
        P::formula("today", |_| "=TODAY()".to_string()),
        P::alias("current date", "today"),
        // Error handling
        P::formula("iferror", |r| format!("=IFERROR({}, \"Error\")", r)),
        P::alias("if error", "iferror"),
    ]
}
