use std::collections::BTreeMap;

use gradebook_merge::error::MergeError;
use gradebook_merge::model::CellValue;
use gradebook_merge::normalize::{RawRow, SheetInput, normalize};

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn keyed(fields: &[(&str, CellValue)]) -> RawRow {
    RawRow::Keyed(
        fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[test]
fn positional_rows_are_zipped_and_padded() {
    let headers = headers(&["No", "Name", "Quiz 1"]);
    let rows = vec![
        RawRow::Positional(vec![CellValue::from(1.0), CellValue::from("Ana Cruz"), CellValue::from(80.0)]),
        RawRow::Positional(vec![CellValue::from(2.0), CellValue::from("Ben Reyes")]),
    ];

    let dataset = normalize(&rows, &headers).expect("normalised");

    assert_eq!(dataset.rows.len(), 2);
    assert_eq!(dataset.rows[0]["Quiz 1"], CellValue::Number(80.0));
    assert_eq!(dataset.rows[1]["Quiz 1"], CellValue::Null);
    for row in &dataset.rows {
        assert_eq!(row.keys().count(), 3);
    }
}

#[test]
fn keyed_rows_fill_missing_and_blank_cells() {
    let headers = headers(&["Name", "Quiz 1", "Quiz 2"]);
    let rows = vec![keyed(&[
        ("Name", CellValue::from("Ana Cruz")),
        ("Quiz 1", CellValue::from("")),
        ("Comment", CellValue::from("dropped")),
    ])];

    let dataset = normalize(&rows, &headers).expect("normalised");
    let row = &dataset.rows[0];

    assert_eq!(row["Quiz 1"], CellValue::Null);
    assert_eq!(row["Quiz 2"], CellValue::Null);
    assert!(!row.contains_key("Comment"));
}

#[test]
fn mixed_row_shapes_are_rejected() {
    let headers = headers(&["Name"]);
    let rows = vec![
        RawRow::Positional(vec![CellValue::from("Ana")]),
        keyed(&[("Name", CellValue::from("Ben"))]),
    ];

    let error = normalize(&rows, &headers).expect_err("mixed shapes rejected");
    assert!(matches!(error, MergeError::MalformedSheet(_)));
}

#[test]
fn empty_or_duplicate_headers_are_rejected() {
    assert!(matches!(
        normalize(&[], &[]),
        Err(MergeError::MalformedSheet(_))
    ));
    assert!(matches!(
        normalize(&[], &headers(&["Name", " "])),
        Err(MergeError::MalformedSheet(_))
    ));
    assert!(matches!(
        normalize(&[], &headers(&["Quiz", "Quiz "])),
        Err(MergeError::MalformedSheet(_))
    ));
}

#[test]
fn values_past_the_last_header_are_rejected() {
    let rows = vec![RawRow::Positional(vec![
        CellValue::from("Ana"),
        CellValue::from(90.0),
    ])];
    assert!(matches!(
        normalize(&rows, &headers(&["Name"])),
        Err(MergeError::MalformedSheet(_))
    ));
}

#[test]
fn normalising_twice_changes_nothing() {
    let headers = headers(&["No", "Last Name", "First Name", "Quiz 1", "Prelim"]);
    let rows = vec![
        RawRow::Positional(vec![
            CellValue::from(1.0),
            CellValue::from("Cruz"),
            CellValue::from("Ana"),
            CellValue::from(80.0),
        ]),
        RawRow::Positional(vec![
            CellValue::from(2.0),
            CellValue::from("Reyes"),
            CellValue::from("  "),
            CellValue::Null,
            CellValue::Date("2024-03-01".into()),
        ]),
    ];

    let once = normalize(&rows, &headers).expect("first pass");
    let keyed_rows: Vec<RawRow> = once.rows.iter().cloned().map(RawRow::from).collect();
    let twice = normalize(&keyed_rows, &headers).expect("second pass");

    assert_eq!(once, twice);
}

#[test]
fn sheet_input_accepts_both_json_shapes() {
    let positional: SheetInput = serde_json::from_value(serde_json::json!({
        "headers": ["Name", "Quiz 1"],
        "rows": [["Ana Cruz", 80], ["Ben Reyes", null]]
    }))
    .expect("positional sheet parsed");
    let keyed: SheetInput = serde_json::from_value(serde_json::json!({
        "headers": ["Name", "Quiz 1"],
        "rows": [{"Name": "Ana Cruz", "Quiz 1": 80}, {"Name": "Ben Reyes"}]
    }))
    .expect("keyed sheet parsed");

    assert_eq!(
        positional.normalize().expect("positional normalised"),
        keyed.normalize().expect("keyed normalised")
    );
}
