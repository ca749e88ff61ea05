//! Wide-format sales CSV parser
//!
//! One row per product, one column per month:
//! `Family, Product Name, Product ID, Price, 2023-07, 2023-08, ...`

use std::path::Path;

use chrono::NaiveDate;

use super::SalesParser;
use crate::types::{ProductRow, Result, SalescastError};

const FAMILY: &str = "Family";
const PRODUCT_NAME: &str = "Product Name";
const PRODUCT_ID: &str = "Product ID";
const PRICE: &str = "Price";

/// Delimiters tried in order
const DELIMITERS: &[u8] = b",;\t";

/// Column positions resolved from the header row
struct Columns {
    family: usize,
    name: Option<usize>,
    product_id: usize,
    price: Option<usize>,
    months: Vec<(usize, NaiveDate)>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Option<Self> {
        let find = |label: &str| headers.iter().position(|h| h.trim() == label);

        let family = find(FAMILY)?;
        let product_id = find(PRODUCT_ID)?;
        let name = find(PRODUCT_NAME);
        let price = find(PRICE);

        let fixed = [Some(family), Some(product_id), name, price];
        let months = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !fixed.contains(&Some(*idx)))
            .filter_map(|(idx, header)| match parse_month(header) {
                Some(month) => Some((idx, month)),
                None => {
                    log::warn!("skipping column '{}': not a YYYY-MM month", header.trim());
                    None
                }
            })
            .collect();

        Some(Self {
            family,
            name,
            product_id,
            price,
            months,
        })
    }
}

/// Parser for wide-format sales CSV files
pub struct WideCsvParser;

impl WideCsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw file content
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<ProductRow>> {
        let text = decode(bytes);
        let delimiter = detect_delimiter(&text)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let columns = Columns::locate(&headers).ok_or_else(|| {
            SalescastError::Parse(format!("missing '{}' or '{}' column", FAMILY, PRODUCT_ID))
        })?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("skipping malformed line {}: {}", line + 2, e);
                    continue;
                }
            };
            if let Some(row) = parse_row(&record, &columns, line + 2) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl Default for WideCsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SalesParser for WideCsvParser {
    fn name(&self) -> &str {
        "wide-csv"
    }

    fn file_pattern(&self) -> &str {
        "**/*.csv"
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<ProductRow>> {
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }
}

/// Build one product row. `None` (with a warning) for rows that cannot be used.
fn parse_row(record: &csv::StringRecord, columns: &Columns, line: usize) -> Option<ProductRow> {
    let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");

    let family = cell(columns.family);
    if family.is_empty() {
        return None;
    }

    let Some(product_id) = parse_integer(cell(columns.product_id)) else {
        log::warn!(
            "line {}: invalid product id '{}', skipping row",
            line,
            cell(columns.product_id)
        );
        return None;
    };

    let raw_price = columns.price.map(cell).unwrap_or("");
    let price = match raw_price.parse::<f64>() {
        Ok(p) if p.is_finite() && p >= 0.0 => p,
        _ => {
            log::warn!("line {}: invalid price '{}', skipping row", line, raw_price);
            return None;
        }
    };

    let mut monthly_sales = Vec::with_capacity(columns.months.len());
    for &(idx, month) in &columns.months {
        let raw = cell(idx);
        if raw.is_empty() {
            log::debug!(
                "line {}: no quantity for {}, skipping",
                line,
                month.format("%Y-%m")
            );
            continue;
        }
        match parse_integer(raw) {
            Some(quantity) => monthly_sales.push((month, quantity)),
            None => log::warn!(
                "line {}: invalid quantity '{}' for {}, skipping",
                line,
                raw,
                month.format("%Y-%m")
            ),
        }
    }

    Some(ProductRow {
        family: family.to_string(),
        name: columns.name.map(cell).unwrap_or("").to_string(),
        product_id,
        price,
        monthly_sales,
    })
}

/// UTF-8, falling back to Latin-1. A leading BOM is dropped.
fn decode(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            log::debug!("input is not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// First delimiter whose header row has the required columns
fn detect_delimiter(text: &str) -> Result<u8> {
    let header_line = text.lines().next().unwrap_or("");

    for &delimiter in DELIMITERS {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_reader(header_line.as_bytes());

        if let Some(Ok(header)) = reader.records().next() {
            let has = |label: &str| header.iter().any(|h| h.trim() == label);
            if has(FAMILY) && has(PRODUCT_ID) {
                return Ok(delimiter);
            }
        }
        log::debug!("delimiter {:?} did not match header", char::from(delimiter));
    }

    Err(SalescastError::Parse(format!(
        "unrecognised header: expected '{}' and '{}' columns",
        FAMILY, PRODUCT_ID
    )))
}

/// `YYYY-MM` header to the first day of that month
fn parse_month(header: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", header.trim()), "%Y-%m-%d").ok()
}

/// Integer cell; integral floats such as `30.0` are accepted
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
