//! Tests for preprocessing and feature alignment

use super::layout::{layout_hash, LayoutInfo};
use super::preprocess::{distinct_count, median, numeric_columns, parse_cell, preprocess};
use crate::logic::ingest::Table;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(names(columns), rows.iter().map(|r| names(r)).collect())
}

#[test]
fn test_parse_cell() {
    assert_eq!(parse_cell(" 1.5 "), Some(1.5));
    assert_eq!(parse_cell("-3"), Some(-3.0));
    assert_eq!(parse_cell("1e3"), Some(1000.0));
    assert_eq!(parse_cell(""), None);
    assert_eq!(parse_cell("tcp"), None);
    assert_eq!(parse_cell("NaN"), None);
}

#[test]
fn test_median_odd_even_and_missing() {
    assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
    assert_eq!(median(&[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]), Some(2.5));
    assert_eq!(median(&[None, None]), None);
}

#[test]
fn test_distinct_count_includes_missing() {
    assert_eq!(distinct_count(&[Some(1.0), Some(1.0)]), 1);
    assert_eq!(distinct_count(&[Some(1.0), None]), 2);
    assert_eq!(distinct_count(&[Some(0.0), Some(-0.0)]), 1);
    assert_eq!(distinct_count(&[None, None]), 1);
}

#[test]
fn test_label_and_identifier_columns_never_become_features() {
    let t = table(
        &["attack", "saddr", "pkts", "category"],
        &[&["1", "10.0.0.1", "5", "DoS"], &["0", "10.0.0.2", "7", "Normal"]],
    );

    let kept: Vec<String> = numeric_columns(&t).into_iter().map(|c| c.name).collect();
    assert_eq!(kept, names(&["pkts"]));

    // Even when a feature list asks for them, they come back as zeros
    let m = preprocess(&t, &names(&["attack", "saddr", "pkts"]));
    assert_eq!(m.shape(), &[2, 3]);
    assert_eq!(m[[0, 0]], 0.0);
    assert_eq!(m[[1, 0]], 0.0);
    assert_eq!(m[[0, 1]], 0.0);
    assert_eq!(m[[0, 2]], 5.0);
    assert_eq!(m[[1, 2]], 7.0);
}

#[test]
fn test_missing_values_filled_with_median() {
    let t = table(&["pkts"], &[&["1"], &[""], &["3"], &["oops"], &["5"]]);

    let m = preprocess(&t, &names(&["pkts"]));

    let column: Vec<f32> = m.column(0).to_vec();
    assert_eq!(column, vec![1.0, 3.0, 3.0, 3.0, 5.0]);
}

#[test]
fn test_zero_variance_columns_are_synthesized_as_zero() {
    let t = table(&["proto", "pkts"], &[&["6", "1"], &["6", "2"], &["6", "3"]]);

    let m = preprocess(&t, &names(&["proto", "pkts"]));

    assert!(m.column(0).iter().all(|&v| v == 0.0));
    assert_eq!(m.column(1).to_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_alignment_order_and_extra_columns() {
    let t = table(
        &[" bytes ", "extra", "pkts"],
        &[&["100", "9", "1"], &["200", "8", "2"]],
    );

    let m = preprocess(&t, &names(&["pkts", "dur", "bytes"]));

    assert_eq!(m.shape(), &[2, 3]);
    assert_eq!(m.row(0).to_vec(), vec![1.0, 0.0, 100.0]);
    assert_eq!(m.row(1).to_vec(), vec![2.0, 0.0, 200.0]);
}

#[test]
fn test_duplicate_columns_keep_first() {
    let t = table(&["pkts", "pkts"], &[&["1", "10"], &["2", "20"]]);

    let m = preprocess(&t, &names(&["pkts"]));

    assert_eq!(m.column(0).to_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_empty_table_gives_empty_matrix() {
    let t = table(&["pkts"], &[]);

    let m = preprocess(&t, &names(&["pkts", "bytes"]));

    assert_eq!(m.shape(), &[0, 2]);
}

#[test]
fn test_layout_hash_depends_on_order() {
    let a = names(&["pkts", "bytes"]);
    let b = names(&["bytes", "pkts"]);

    assert_eq!(layout_hash(&a), layout_hash(&a.clone()));
    assert_ne!(layout_hash(&a), layout_hash(&b));
    assert_eq!(LayoutInfo::of(&a).feature_count, 2);
}

#[test]
fn test_layout_info_display() {
    let a = names(&["pkts", "bytes"]);
    let info = LayoutInfo::of(&a);

    assert_eq!(info, LayoutInfo::of(&a.clone()));
    assert_eq!(
        info.to_string(),
        format!("2 features, layout {:08x}", layout_hash(&a))
    );
}
