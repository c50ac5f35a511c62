//! Tests for the static pattern table.

use formula_shared::patterns::builtin_declarations;
use formula_shared::{default_formula, validate, PatternDecl, PatternTable};

fn builtin() -> PatternTable {
    PatternTable::builtin().expect("built-in table must build")
}

#[test]
fn test_exact_match_beats_earlier_fuzzy_match() {
    // "sum" is declared first and is contained in "sum positive"; an exact
    // description must still reach its own template.
    let table = PatternTable::build(vec![
        PatternDecl::formula("sum", |r| format!("=SUM({})", r)),
        PatternDecl::formula("sum positive", |r| format!("=SUMIF({},\">0\")", r)),
    ])
    .unwrap();

    assert_eq!(table.resolve("sum positive", "F1:F10"), "=SUMIF(F1:F10,\">0\")");
    assert_eq!(table.resolve("Sum Positive ", "F1:F10"), "=SUMIF(F1:F10,\">0\")");
    // Non-exact: declaration order decides.
    assert_eq!(table.resolve("the sum positive values", "F1:F10"), "=SUM(F1:F10)");
}

#[test]
fn test_declaration_order_decides_fuzzy_ties() {
    let first = PatternTable::build(vec![
        PatternDecl::formula("max", |r| format!("=MAX({})", r)),
        PatternDecl::formula("min", |r| format!("=MIN({})", r)),
    ])
    .unwrap();
    let second = PatternTable::build(vec![
        PatternDecl::formula("min", |r| format!("=MIN({})", r)),
        PatternDecl::formula("max", |r| format!("=MAX({})", r)),
    ])
    .unwrap();

    assert_eq!(first.resolve("min and max", "A1:A3"), "=MAX(A1:A3)");
    assert_eq!(second.resolve("min and max", "A1:A3"), "=MIN(A1:A3)");
}

#[test]
fn test_known_descriptions() {
    let table = builtin();
    let cases = [
        ("CAGR", "A2:A10", "=POWER(INDEX(A2:A10,ROWS(A2:A10))/INDEX(A2:A10,1),1/(ROWS(A2:A10)-1))-1"),
        ("sum", "B1:B5", "=SUM(B1:B5)"),
        ("average excluding zeros", "C2:C20", "=AVERAGEIF(C2:C20,\"<>0\")"),
        ("growth rate", "D1:D3", "=(INDEX(D1:D3,ROWS(D1:D3))/INDEX(D1:D3,1))-1"),
        ("moving average", "E2:E15", "=AVERAGE(OFFSET(E2:E15,ROW()-ROW(E2:E15)-4,0,5,1))"),
        ("sum positive", "F1:F10", "=SUMIF(F1:F10,\">0\")"),
        ("unknown formula", "G1:G5", "=AVERAGE(G1:G5)"),
        ("count blanks", "H1:H9", "=COUNTBLANK(H1:H9)"),
        ("75th percentile", "I1:I9", "=PERCENTILE(I1:I9, 0.75)"),
        ("vertical lookup", "J1:K9", "=VLOOKUP(\"search_key\", J1:K9, 2, FALSE)"),
        ("if error", "L1", "=IFERROR(L1, \"Error\")"),
    ];

    for (description, range, expected) in cases {
        assert_eq!(table.resolve(description, range), expected, "description: {}", description);
    }
}

#[test]
fn test_no_match_falls_back_to_average() {
    let table = builtin();
    for description in ["zzz", "give me something clever", "1234"] {
        assert_eq!(table.resolve(description, "Q1:Q4"), default_formula("Q1:Q4"));
    }
}

#[test]
fn test_every_builtin_template_is_safe() {
    let table = builtin();
    for entry in table.entries() {
        let formula = (entry.template)("A2:A10");
        assert!(formula.starts_with('='), "{} -> {}", entry.phrase, formula);
        assert!(validate(&formula), "{} -> {} failed validation", entry.phrase, formula);
    }
}

#[test]
fn test_builtin_phrases_are_normalized() {
    for decl in builtin_declarations() {
        assert_eq!(decl.phrase, decl.phrase.trim().to_lowercase());
    }
}

#[test]
fn test_ambiguous_descriptions_keep_group_order() {
    let table = builtin();
    let cases = [
        ("average growth rate", "=AVERAGE(ARRAYFORMULA(A1:A9/OFFSET(A1:A9,1,0,ROWS(A1:A9)-1,1)-1))"),
        ("median growth rate", "=MEDIAN(A1:A9)"),
        ("standard deviation of growth rate", "=STDEV(A1:A9)"),
        ("mean growth rate", "=AVERAGE(A1:A9)"),
        ("max growth rate", "=MAX(A1:A9)"),
        ("average remaining balance", "=AVERAGE(A1:A9)"),
        ("growth rate of sales", "=(INDEX(A1:A9,ROWS(A1:A9))/INDEX(A1:A9,1))-1"),
        ("count of sales", "=COUNT(A1:A9)"),
        ("the sum positive values", "=SUMIF(A1:A9,\">0\")"),
        ("the 25th percentile please", "=PERCENTILE(A1:A9, 0.25)"),
        ("a 7 day moving average 7", "=AVERAGE(OFFSET(A1:A9,ROW()-ROW(A1:A9)-6,0,7,1))"),
    ];

    for (description, expected) in cases {
        assert_eq!(table.resolve(description, "A1:A9"), expected, "description: {}", description);
    }
}
