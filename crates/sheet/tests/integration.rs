use chrono::NaiveDate;
use gridlink_sheet::{
    Aggregate, CellValue, Entity, IndexSpec, LoadOptions, Report, RowFilter, RowLookup, Sheet,
    SheetError,
};
use serde_json::{json, Value};

fn contacts_json(rows: &[(i64, &str, &str, &str)]) -> Value {
    let rows: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(pos, (id, name, email, company))| {
            json!({
                "id": id,
                "rowNumber": pos + 1,
                "cells": [
                    {"columnId": 1, "value": name},
                    {"columnId": 2, "value": email},
                    {"columnId": 3, "value": company}
                ]
            })
        })
        .collect();
    json!({
        "id": 7,
        "name": "Contacts",
        "columns": [
            {"id": 1, "title": "Full Name", "type": "TEXT_NUMBER", "primary": true},
            {"id": 2, "title": "Email address", "type": "TEXT_NUMBER"},
            {"id": 3, "title": "Company", "type": "TEXT_NUMBER"}
        ],
        "rows": rows
    })
}

fn contacts() -> Sheet {
    Sheet::from_json(
        contacts_json(&[
            (1, "Bob Lee", "bob.lee@acme.com", "ACME"),
            (2, "Alice Smith", "alice.smith@globex.com", "Globex"),
        ]),
        &LoadOptions::strict(),
    )
    .unwrap()
}

fn name_of(sheet: &Sheet, row_id: Option<i64>) -> String {
    let row = sheet
        .get_row(RowLookup::Id(row_id.unwrap()))
        .unwrap()
        .unwrap();
    row.value("Full Name")
        .unwrap()
        .and_then(CellValue::as_str)
        .unwrap()
        .to_string()
}

// ===== Index Tests =====

#[test]
fn test_contacts_round_trip() {
    let mut sheet = contacts();
    sheet
        .build_index([
            IndexSpec::non_unique(["Company"]),
            IndexSpec::unique(["Email address"]),
        ])
        .unwrap();

    let acme = sheet
        .get_rows(&RowFilter::new().with("Company", "ACME"))
        .unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(name_of(&sheet, acme[0].id), "Bob Lee");

    let alice = sheet
        .get_row(&RowFilter::new().with("Email address", "alice.smith@globex.com"))
        .unwrap()
        .unwrap();
    assert_eq!(name_of(&sheet, alice.id), "Alice Smith");
}

#[test]
fn test_get_rows_through_unique_index() {
    let mut sheet = contacts();
    sheet
        .build_index([IndexSpec::unique(["Email address"])])
        .unwrap();

    let ids: Vec<_> = sheet
        .get_rows(&RowFilter::new().with("Email address", "alice.smith@globex.com"))
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(ids, vec![Some(2)]);
}

#[test]
fn test_non_unique_keeps_row_order() {
    let mut sheet = Sheet::from_json(
        contacts_json(&[
            (1, "r1", "r1@acme.com", "ACME"),
            (2, "r2", "r2@globex.com", "Globex"),
            (3, "r3", "r3@acme.com", "ACME"),
        ]),
        &LoadOptions::default(),
    )
    .unwrap();
    sheet
        .build_index([IndexSpec::non_unique(["Company"])])
        .unwrap();

    let ids: Vec<_> = sheet
        .get_rows(&RowFilter::new().with("Company", "ACME"))
        .unwrap()
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(ids, vec![Some(1), Some(3)]);
}

#[test]
fn test_missing_index_and_non_unique_errors() {
    let mut sheet = contacts();
    let by_company = RowFilter::new().with("Company", "ACME");

    assert!(matches!(
        sheet.get_rows(&by_company),
        Err(SheetError::IndexNotFound { .. })
    ));

    sheet
        .build_index([IndexSpec::non_unique(["Company"])])
        .unwrap();
    assert!(matches!(
        sheet.get_row(&by_company),
        Err(SheetError::IndexNotUnique { .. })
    ));
    assert!(sheet.get_rows(&by_company).is_ok());
}

#[test]
fn test_composite_filter_order_independent() {
    let mut sheet = contacts();
    sheet
        .build_index([IndexSpec::unique(["Full Name", "Company"])])
        .unwrap();

    let filter: RowFilter = [("Company", "Globex"), ("Full Name", "Alice Smith")]
        .into_iter()
        .collect();
    let row = sheet.get_row(&filter).unwrap().unwrap();
    assert_eq!(row.id, Some(2));

    let miss = RowFilter::new()
        .with("Full Name", "Alice Smith")
        .with("Company", "ACME");
    assert!(sheet.get_row(&miss).unwrap().is_none());
    assert!(sheet.get_rows(&miss).unwrap().is_empty());

    // a subset of the indexed columns does not match
    assert!(matches!(
        sheet.get_row(&RowFilter::new().with("Company", "Globex")),
        Err(SheetError::IndexNotFound { .. })
    ));
}

#[test]
fn test_unique_collision_policies() {
    let mut sheet = Sheet::from_json(
        contacts_json(&[
            (1, "Bob Lee", "bob@acme.com", "ACME"),
            (2, "Ann Lee", "ann@acme.com", "ACME"),
        ]),
        &LoadOptions::default(),
    )
    .unwrap();

    sheet.build_index([IndexSpec::unique(["Company"])]).unwrap();
    let winner = sheet
        .get_row(&RowFilter::new().with("Company", "ACME"))
        .unwrap()
        .unwrap();
    assert_eq!(winner.id, Some(2));

    let err = sheet
        .build_index([IndexSpec::unique(["Company"]).strict()])
        .unwrap_err();
    assert!(matches!(err, SheetError::DuplicateIndexKey { .. }));
    // the permissive index built earlier is still usable
    assert!(sheet
        .get_row(&RowFilter::new().with("Company", "ACME"))
        .unwrap()
        .is_some());
}

#[test]
fn test_empty_value_is_a_key() {
    let mut sheet = Sheet::from_json(
        json!({
            "name": "Sparse",
            "columns": [
                {"id": 1, "title": "Name", "type": "TEXT_NUMBER"},
                {"id": 2, "title": "Owner", "type": "TEXT_NUMBER"}
            ],
            "rows": [
                {"id": 1, "rowNumber": 1, "cells": [{"columnId": 1, "value": "a"}, {"columnId": 2}]},
                {"id": 2, "rowNumber": 2, "cells": [{"columnId": 1, "value": "b"}, {"columnId": 2, "value": "x"}]}
            ]
        }),
        &LoadOptions::default(),
    )
    .unwrap();
    sheet.build_index([IndexSpec::non_unique(["Owner"])]).unwrap();

    let unowned = sheet
        .get_rows(&RowFilter::new().with_empty("Owner"))
        .unwrap();
    assert_eq!(unowned.len(), 1);
    assert_eq!(unowned[0].id, Some(1));
}

// ===== Reconstruction Tests =====

#[test]
fn test_sorted_response_rebuilds_lookups() {
    let sheet = contacts();
    let before = sheet.get_row(RowLookup::Number(1)).unwrap().unwrap().id;
    assert_eq!(before, Some(1));

    // the server answers a sort with the rows renumbered
    let sorted = Sheet::from_json(
        contacts_json(&[
            (2, "Alice Smith", "alice.smith@globex.com", "Globex"),
            (1, "Bob Lee", "bob.lee@acme.com", "ACME"),
        ]),
        &LoadOptions::default(),
    )
    .unwrap();
    assert_eq!(
        sorted.get_row(RowLookup::Number(1)).unwrap().unwrap().id,
        Some(2)
    );
    assert_eq!(
        sorted.get_row(RowLookup::Id(1)).unwrap().unwrap().num,
        Some(2)
    );
}

#[test]
fn test_dump_then_load_keeps_rows() {
    let sheet = contacts();
    let again = Sheet::from_json(sheet.dump(None), &LoadOptions::strict()).unwrap();
    assert_eq!(again.as_list(), sheet.as_list());
    assert_eq!(again.columns(), sheet.columns());
}

// ===== Coercion Tests =====

#[test]
fn test_date_and_checkbox_coercion() {
    let sheet = Sheet::from_json(
        json!({
            "name": "People",
            "columns": [
                {"id": 1, "title": "Birth date", "type": "DATE"},
                {"id": 2, "title": "Married", "type": "CHECKBOX"},
                {"id": 3, "title": "Seen", "type": "DATETIME"}
            ],
            "rows": [
                {"id": 1, "rowNumber": 1, "cells": [
                    {"columnId": 1, "value": "1990-01-01"},
                    {"columnId": 2},
                    {"columnId": 3, "value": "2020-05-01T10:00:00Z"}
                ]},
                {"id": 2, "rowNumber": 2, "cells": [
                    {"columnId": 1, "value": "sometime in May"},
                    {"columnId": 2, "value": true},
                    {"columnId": 3, "value": "later"}
                ]}
            ]
        }),
        &LoadOptions::default(),
    )
    .unwrap();

    let first = &sheet.rows()[0];
    assert_eq!(
        first.value("Birth date").unwrap(),
        Some(&CellValue::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()))
    );
    assert_eq!(first.value("Married").unwrap(), Some(&CellValue::Bool(false)));
    assert!(first
        .value("Seen")
        .unwrap()
        .and_then(CellValue::as_datetime)
        .is_some());

    let second = &sheet.rows()[1];
    assert_eq!(
        second.value("Birth date").unwrap(),
        Some(&CellValue::Text("sometime in May".into()))
    );
    assert_eq!(second.value("Married").unwrap(), Some(&CellValue::Bool(true)));
    assert_eq!(
        second.value("Seen").unwrap(),
        Some(&CellValue::Text("later".into()))
    );
}

#[test]
fn test_datetime_keeps_fractional_seconds() {
    let sheet = Sheet::from_json(
        json!({
            "name": "Events",
            "columns": [{"id": 1, "title": "Seen", "type": "DATETIME"}],
            "rows": [{"id": 1, "rowNumber": 1, "cells": [
                {"columnId": 1, "value": "2020-05-01T10:00:00.250Z"}
            ]}]
        }),
        &LoadOptions::strict(),
    )
    .unwrap();

    let dumped = sheet.dump(None);
    assert_eq!(
        dumped["rows"][0]["cells"][0]["value"],
        json!("2020-05-01T10:00:00.250Z")
    );
    let again = Sheet::from_json(dumped, &LoadOptions::strict()).unwrap();
    assert_eq!(again.as_list(), sheet.as_list());
}

#[test]
fn test_index_on_date_column() {
    let mut sheet = Sheet::from_json(
        json!({
            "name": "Events",
            "columns": [{"id": 1, "title": "Day", "type": "DATE"}],
            "rows": [{"id": 9, "rowNumber": 1, "cells": [{"columnId": 1, "value": "2021-03-04"}]}]
        }),
        &LoadOptions::default(),
    )
    .unwrap();
    sheet.build_index([IndexSpec::unique(["Day"])]).unwrap();

    let day = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
    let row = sheet
        .get_row(&RowFilter::new().with("Day", day))
        .unwrap()
        .unwrap();
    assert_eq!(row.id, Some(9));
}

// ===== Validation Tests =====

#[test]
fn test_strict_rejects_unknown_fields() {
    let payload = json!({"name": "x", "unexpectedField": 1});
    assert!(matches!(
        Sheet::from_json(payload.clone(), &LoadOptions::strict()),
        Err(SheetError::UnknownField { .. })
    ));
    assert!(Sheet::from_json(payload, &LoadOptions::lenient()).is_ok());
}

// ===== Report Tests =====

#[test]
fn test_report_index_over_virtual_columns() {
    let mut report = Report::from_json(
        json!({
            "id": 50,
            "name": "All contacts",
            "totalRowCount": 2,
            "sourceSheets": [{"id": 7, "name": "Contacts"}, {"id": 8, "name": "Leads"}],
            "columns": [
                {"virtualId": 501, "title": "Email", "type": "TEXT_NUMBER"},
                {"virtualId": 502, "title": "Sheet Name", "type": "TEXT_NUMBER", "sheetNameColumn": true}
            ],
            "rows": [
                {"id": 1, "sheetId": 7, "rowNumber": 1, "cells": [
                    {"columnId": 2, "virtualColumnId": 501, "value": "bob@acme.com"},
                    {"virtualColumnId": 502, "value": "Contacts"}]},
                {"id": 2, "sheetId": 8, "rowNumber": 2, "cells": [
                    {"columnId": 4, "virtualColumnId": 501, "value": "ann@acme.com"},
                    {"virtualColumnId": 502, "value": "Leads"}]}
            ]
        }),
        &LoadOptions::strict(),
    )
    .unwrap();

    report
        .build_index([IndexSpec::unique(["Email"]), IndexSpec::non_unique(["Sheet Name"])])
        .unwrap();
    let ann = report
        .get_row(&RowFilter::new().with("Email", "ann@acme.com"))
        .unwrap()
        .unwrap();
    assert_eq!(ann.sheet_id, Some(8));
    assert_eq!(
        report
            .get_rows(&RowFilter::new().with("Sheet Name", "Contacts"))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(report.get_column(502_i64).unwrap().sheet_name_column, Some(true));
}
