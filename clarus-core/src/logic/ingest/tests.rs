use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::reader::{read_csv_robust, read_csv_with, Delimiter};
use super::table::Table;
use super::writer::{scored_file_name, write_csv};
use super::CsvError;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_comma_file_uses_comma() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", "pkts,bytes,dur\n1,2,3\n4,5,6\n");

    let (table, delimiter) = read_csv_robust(&path, None).unwrap();

    assert_eq!(delimiter, Delimiter::Comma);
    assert_eq!(table.columns(), &names(&["pkts", "bytes", "dur"])[..]);
    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.rows()[1], names(&["4", "5", "6"]));
}

#[test]
fn test_single_column_semicolon_header_is_reparsed() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", "a;b;c\n1;2;3\n");

    let (table, delimiter) = read_csv_robust(&path, None).unwrap();

    assert_eq!(delimiter, Delimiter::Semicolon);
    assert_eq!(table.n_cols(), 3);
    assert_eq!(table.columns(), &names(&["a", "b", "c"])[..]);
}

#[test]
fn test_single_column_tab_header_is_reparsed() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.tsv", "a\tb\tc\n1\t2\t3\n");

    let (table, delimiter) = read_csv_robust(&path, None).unwrap();

    assert_eq!(delimiter, Delimiter::Tab);
    assert_eq!(table.n_cols(), 3);
}

#[test]
fn test_single_semicolon_is_not_enough() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", "a;b\n1;2\n");

    let (table, delimiter) = read_csv_robust(&path, None).unwrap();

    assert_eq!(delimiter, Delimiter::Comma);
    assert_eq!(table.columns(), &names(&["a;b"])[..]);
}

#[test]
fn test_expected_columns_pick_best_overlap() {
    let dir = TempDir::new().unwrap();
    // Comma parse yields two columns, so the header heuristic does not fire
    let path = write_file(&dir, "flows.csv", "flow,id;pkts;bytes;dur\n1,2;3;4;5\n");
    let expected = names(&["pkts", "bytes", "dur"]);

    let (table, delimiter) = read_csv_robust(&path, Some(&expected)).unwrap();

    assert_eq!(delimiter, Delimiter::Semicolon);
    assert_eq!(table.columns(), &names(&["flow,id", "pkts", "bytes", "dur"])[..]);
}

#[test]
fn test_overlap_tie_keeps_comma() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", "x,y\n1,2\n");
    let expected = names(&["pkts"]);

    let (_, delimiter) = read_csv_robust(&path, Some(&expected)).unwrap();

    assert_eq!(delimiter, Delimiter::Comma);
}

#[test]
fn test_column_names_are_trimmed() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", " pkts , bytes,dur \n1,2,3\n");

    let (table, _) = read_csv_robust(&path, None).unwrap();

    assert_eq!(table.columns(), &names(&["pkts", "bytes", "dur"])[..]);
}

#[test]
fn test_empty_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "empty.csv", "");

    let err = read_csv_robust(&path, None).unwrap_err();

    assert!(matches!(err, CsvError::Empty));
    assert_eq!(err.to_string(), "Empty file");
}

#[test]
fn test_default_delimiter_error_propagates() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "bad.csv", "a,b\n1,2,3\n");

    let err = read_csv_robust(&path, Some(&names(&["a", "b"]))).unwrap_err();

    assert!(matches!(err, CsvError::Malformed { expected: 2, found: 3, .. }));
}

#[test]
fn test_alternate_delimiter_errors_are_skipped() {
    let dir = TempDir::new().unwrap();
    // Valid under comma, ragged under semicolon
    let path = write_file(&dir, "flows.csv", "pkts,bytes\n1,2\n3;4;5,6\n");
    let expected = names(&["pkts", "bytes"]);

    let (table, delimiter) = read_csv_robust(&path, Some(&expected)).unwrap();

    assert_eq!(delimiter, Delimiter::Comma);
    assert_eq!(table.n_rows(), 2);
}

#[test]
fn test_short_rows_are_padded_and_blank_lines_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "flows.csv", "a,b,c\n1,2\n\n4,5,6\n");

    let table = read_csv_with(&path, Delimiter::Comma).unwrap();

    assert_eq!(table.n_rows(), 2);
    assert_eq!(table.rows()[0], names(&["1", "2", ""]));
}

#[test]
fn test_write_csv_keeps_cells_verbatim() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let table = Table::new(
        names(&["saddr", "note"]),
        vec![names(&["10.0.0.1", "a, quoted \"value\""])],
    );

    write_csv(&table, &path).unwrap();
    let back = read_csv_with(&path, Delimiter::Comma).unwrap();

    assert_eq!(back, table);
}

#[test]
fn test_scored_file_name() {
    assert_eq!(scored_file_name(Path::new("/data/uploads/abc_flows.csv")), "abc_flows_scored.csv");
    assert_eq!(scored_file_name(Path::new("flows.CSV")), "flows_scored.csv");
    assert_eq!(scored_file_name(Path::new("flows.txt")), "flows.txt_scored.csv");
}

#[test]
fn test_table_column_operations() {
    let mut table = Table::new(
        names(&["a", "attack", "b"]),
        vec![names(&["1", "0", "2"]), names(&["3", "1", "4"])],
    );

    let trimmed = table.without_columns(&["attack"]);
    assert_eq!(trimmed.columns(), &names(&["a", "b"])[..]);
    assert_eq!(trimmed.rows()[1], names(&["3", "4"]));

    let subset = table.select_rows(&[1]);
    assert_eq!(subset.n_rows(), 1);
    assert_eq!(subset.column(0).collect::<Vec<_>>(), vec!["3"]);

    table.push_column("is_attack", names(&["0", "1"]));
    assert_eq!(table.column_index("is_attack"), Some(3));
}

#[test]
fn test_set_column_collapses_duplicate_names() {
    let mut table = Table::new(
        names(&["is_attack", "pkts", "is_attack", "bytes", "is_attack"]),
        vec![
            names(&["x", "10", "y", "500", "z"]),
            names(&["x", "20", "y", "600", "z"]),
        ],
    );

    table.set_column("is_attack", names(&["0", "1"]));

    assert_eq!(table.columns(), &names(&["is_attack", "pkts", "bytes"])[..]);
    assert_eq!(table.rows()[0], names(&["0", "10", "500"]));
    assert_eq!(table.rows()[1], names(&["1", "20", "600"]));

    table.set_column("attack_type", names(&["benign", "DoS"]));
    assert_eq!(table.column_index("attack_type"), Some(3));
}
