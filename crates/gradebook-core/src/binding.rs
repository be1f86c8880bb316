//! Variable bindings exposed to formulas.
//!
//! Unit formulas see each evaluation item as `N{i}` (1-based position) and as
//! its sanitized name. Class formulas see each unit average as `N{i}` and
//! `u{i}`; units are addressed by position only.

use std::collections::{BTreeMap, BTreeSet};

/// Name to value mapping for one formula evaluation.
pub type Bindings = BTreeMap<String, f64>;

/// Lowercase a name and join its whitespace-separated words with `_`.
///
/// `"Test  1"` becomes `"test_1"`.
pub fn sanitize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Bind evaluation items for a unit formula.
///
/// A missing grade binds to `0` so formulas may reference every slot.
/// When two item names sanitize to the same alias the first one keeps it.
pub fn bind_items<'a, I>(items: I) -> Bindings
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut bindings = Bindings::new();
    let mut aliases: Vec<(String, f64)> = Vec::new();

    for (i, (name, value)) in items.into_iter().enumerate() {
        let value = value.unwrap_or(0.0);
        bindings.insert(format!("N{}", i + 1), value);
        let alias = sanitize_name(name);
        if !alias.is_empty() {
            aliases.push((alias, value));
        }
    }

    // Position names win over aliases that happen to collide with them.
    for (alias, value) in aliases {
        bindings.entry(alias).or_insert(value);
    }

    bindings
}

/// Bind unit averages for a class formula.
pub fn bind_units<I>(averages: I) -> Bindings
where
    I: IntoIterator<Item = f64>,
{
    let mut bindings = Bindings::new();
    for (i, value) in averages.into_iter().enumerate() {
        bindings.insert(format!("N{}", i + 1), value);
        bindings.insert(format!("u{}", i + 1), value);
    }
    bindings
}

/// Names a unit formula may reference, given the unit's item names in order.
pub fn item_variable_names<'a, I>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    bind_items(names.into_iter().map(|n| (n, None)))
        .into_keys()
        .collect()
}

/// Names a class formula may reference, given how many units the class has.
pub fn unit_variable_names(unit_count: usize) -> BTreeSet<String> {
    bind_units(std::iter::repeat(0.0).take(unit_count))
        .into_keys()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_joins_words() {
        assert_eq!(sanitize_name("Test 1"), "test_1");
        assert_eq!(sanitize_name("  Final   Exam "), "final_exam");
        assert_eq!(sanitize_name("Trabalho\tPrático"), "trabalho_prático");
        assert_eq!(sanitize_name("   "), "");
    }

    #[test]
    fn items_bind_index_and_alias() {
        let b = bind_items([("Test 1", Some(8.0)), ("Project", Some(6.5))]);
        assert_eq!(b.get("N1"), Some(&8.0));
        assert_eq!(b.get("test_1"), Some(&8.0));
        assert_eq!(b.get("N2"), Some(&6.5));
        assert_eq!(b.get("project"), Some(&6.5));
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn missing_grade_binds_zero() {
        let b = bind_items([("Quiz", None), ("Exam", Some(9.0))]);
        assert_eq!(b.get("N1"), Some(&0.0));
        assert_eq!(b.get("quiz"), Some(&0.0));
        assert_eq!(b.get("N2"), Some(&9.0));
    }

    #[test]
    fn colliding_aliases_keep_first() {
        let b = bind_items([("Test 1", Some(1.0)), ("test  1", Some(2.0))]);
        assert_eq!(b.get("test_1"), Some(&1.0));
        assert_eq!(b.get("N2"), Some(&2.0));
    }

    #[test]
    fn units_bind_n_and_u() {
        let b = bind_units([7.0, 6.5]);
        assert_eq!(b.get("N1"), Some(&7.0));
        assert_eq!(b.get("u1"), Some(&7.0));
        assert_eq!(b.get("N2"), Some(&6.5));
        assert_eq!(b.get("u2"), Some(&6.5));
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn available_names() {
        let items = item_variable_names(["Test 1", "Lab"]);
        assert!(items.contains("N1") && items.contains("N2"));
        assert!(items.contains("test_1") && items.contains("lab"));
        let units = unit_variable_names(2);
        assert_eq!(units.len(), 4);
        assert!(units.contains("u2"));
        assert!(unit_variable_names(0).is_empty());
    }
}
