//! CSV export of result records: UTF-8 with BOM, comma-separated, header row
//! in the fixed result-column order.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::ResultRecord;

const BOM: &str = "\u{feff}";

/// Result columns, in display order.
pub const CSV_HEADERS: [&str; 20] = [
    "product_name",
    "option",
    "cif_krw",
    "fob_krw",
    "duty",
    "vat",
    "shipping_fee",
    "delivery_fee",
    "ad_cost",
    "platform_fee",
    "sgna_cost",
    "unit_total_cost",
    "cost_rate_pct",
    "unit_margin",
    "margin_rate_pct",
    "target_qty",
    "target_sales",
    "est_ad_spend",
    "est_operating_profit",
    "est_profit_rate_pct",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unexpected CSV header: {0}")]
    Header(String),
    #[error("row {row} has {found} fields, expected {expected}")]
    FieldCount {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("row {row}: bad number in '{field}': {value}")]
    Number {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Render records to CSV text, BOM included.
pub fn render_csv(records: &[ResultRecord]) -> String {
    let mut out = String::from(BOM);
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');

    for record in records {
        let fields = [
            escape_field(&record.product_name),
            escape_field(&record.option_label),
            record.cif_krw.to_string(),
            record.fob_krw.to_string(),
            record.duty.to_string(),
            record.vat.to_string(),
            record.shipping_fee.to_string(),
            record.delivery_fee.to_string(),
            record.ad_cost.to_string(),
            record.platform_fee.to_string(),
            record.sgna_cost.to_string(),
            record.unit_total_cost.to_string(),
            escape_field(&record.cost_rate),
            record.unit_margin.to_string(),
            escape_field(&record.margin_rate),
            record.target_quantity.to_string(),
            record.target_sales.to_string(),
            record.est_ad_spend.to_string(),
            record.est_operating_profit.to_string(),
            escape_field(&record.est_profit_rate),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Write the CSV document to disk.
pub fn write_csv(path: &Path, records: &[ResultRecord]) -> Result<(), ExportError> {
    fs::write(path, render_csv(records))?;
    Ok(())
}

/// Parse an exported document back into records. Used to check the export
/// against the in-memory rows; displayed rounding is the expected precision.
pub fn parse_csv(text: &str) -> Result<Vec<ResultRecord>, ExportError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut rows = split_records(text).into_iter();

    let header = rows.next().unwrap_or_default();
    if header != CSV_HEADERS {
        return Err(ExportError::Header(header.join(",")));
    }

    let mut records = Vec::new();
    for (index, fields) in rows.enumerate() {
        let row = index + 2; // header is row 1
        if fields.len() != CSV_HEADERS.len() {
            return Err(ExportError::FieldCount {
                row,
                found: fields.len(),
                expected: CSV_HEADERS.len(),
            });
        }

        records.push(ResultRecord {
            product_name: fields[0].clone(),
            option_label: fields[1].clone(),
            cif_krw: parse_i64(row, "cif_krw", &fields[2])?,
            fob_krw: parse_i64(row, "fob_krw", &fields[3])?,
            duty: parse_i64(row, "duty", &fields[4])?,
            vat: parse_i64(row, "vat", &fields[5])?,
            shipping_fee: parse_i64(row, "shipping_fee", &fields[6])?,
            delivery_fee: parse_i64(row, "delivery_fee", &fields[7])?,
            ad_cost: parse_i64(row, "ad_cost", &fields[8])?,
            platform_fee: parse_i64(row, "platform_fee", &fields[9])?,
            sgna_cost: parse_i64(row, "sgna_cost", &fields[10])?,
            unit_total_cost: parse_i64(row, "unit_total_cost", &fields[11])?,
            cost_rate: fields[12].clone(),
            unit_margin: parse_i64(row, "unit_margin", &fields[13])?,
            margin_rate: fields[14].clone(),
            target_quantity: parse_i64(row, "target_qty", &fields[15])? as u32,
            target_sales: parse_i64(row, "target_sales", &fields[16])?,
            est_ad_spend: parse_i64(row, "est_ad_spend", &fields[17])?,
            est_operating_profit: parse_i64(row, "est_operating_profit", &fields[18])?,
            est_profit_rate: fields[19].clone(),
        });
    }

    Ok(records)
}

fn parse_i64(row: usize, field: &'static str, value: &str) -> Result<i64, ExportError> {
    value.trim().parse::<i64>().map_err(|_| ExportError::Number {
        row,
        field,
        value: value.to_string(),
    })
}

/// Quote a field when it contains a separator, quote, or line break.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split CSV text into records of fields, honoring quoted sections.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                '\r' => {}
                '\n' => {
                    fields.push(std::mem::take(&mut current));
                    rows.push(std::mem::take(&mut fields));
                }
                _ => current.push(c),
            }
        }
    }

    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        rows.push(fields);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::costing::{cost_rows, CostParams};
    use crate::domain::entities::{QuoteRow, RateTable};
    use crate::domain::report::to_records;

    fn sample_records() -> Vec<ResultRecord> {
        let summary = cost_rows(
            &QuoteRow::samples(),
            &RateTable::defaults(),
            &CostParams::default(),
        );
        to_records(&summary.rows)
    }

    #[test]
    fn document_starts_with_bom_and_headers() {
        let csv = render_csv(&sample_records());
        assert!(csv.starts_with('\u{feff}'));
        let first_line = csv.trim_start_matches('\u{feff}').lines().next().unwrap();
        assert_eq!(first_line, CSV_HEADERS.join(","));
    }

    #[test]
    fn export_round_trips_at_display_precision() {
        let records = sample_records();
        let parsed = parse_csv(&render_csv(&records)).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn commas_and_quotes_in_names_survive_the_trip() {
        let mut records = sample_records();
        records[0].product_name = "Bag, \"large\"".to_string();
        records[0].option_label = "Black\nMatte".to_string();
        let parsed = parse_csv(&render_csv(&records)).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn foreign_header_is_rejected() {
        let err = parse_csv("\u{feff}a,b,c\n1,2,3\n").unwrap_err();
        assert!(matches!(err, ExportError::Header(_)));
    }

    #[test]
    fn short_row_is_a_field_count_error() {
        let mut doc = String::from(BOM);
        doc.push_str(&CSV_HEADERS.join(","));
        doc.push_str("\nBag,Black,1\n");
        let err = parse_csv(&doc).unwrap_err();
        assert!(matches!(
            err,
            ExportError::FieldCount { row: 2, found: 3, .. }
        ));
    }
}
