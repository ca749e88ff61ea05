//! SQLite-backed sales store
//!
//! Holds families, products and their dated sales. The schema is applied on
//! every open and is idempotent.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::types::{
    Family, Product, ProductRow, Result, SaleRecord, SalescastError, ValidationIssue,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS families (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS products (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL,
    price     REAL NOT NULL,
    family_id INTEGER NOT NULL REFERENCES families(id)
);
CREATE TABLE IF NOT EXISTS sales (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id),
    date       TEXT NOT NULL,
    quantity   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sales_product_date ON sales(product_id, date);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Counts reported by [`SalesStore::import`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub families_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
    pub sales_inserted: usize,
}

/// Store handle. One connection, owned by the caller.
pub struct SalesStore {
    conn: Connection,
}

impl SalesStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Fresh private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn get_product(&self, product_id: i64) -> Result<Option<Product>> {
        let product = self
            .conn
            .query_row(
                "SELECT id, name, price, family_id FROM products WHERE id = ?1",
                [product_id],
                |row| {
                    Ok(Product {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        price: row.get(2)?,
                        family_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(product)
    }

    pub fn get_family(&self, family_id: i64) -> Result<Option<Family>> {
        let family = self
            .conn
            .query_row(
                "SELECT id, name FROM families WHERE id = ?1",
                [family_id],
                |row| {
                    Ok(Family {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(family)
    }

    /// Set a product's price. `None` when the product does not exist.
    pub fn update_product_price(&self, product_id: i64, price: f64) -> Result<Option<Product>> {
        if !price.is_finite() || price < 0.0 {
            return Err(SalescastError::invalid_parameter(
                "price",
                format!("{} is not a non-negative amount", price),
            ));
        }

        let changed = self.conn.execute(
            "UPDATE products SET price = ?1 WHERE id = ?2",
            params![price, product_id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_product(product_id)
    }

    /// Move a product into another family
    pub fn assign_product_to_family(&self, family_id: i64, product_id: i64) -> Result<()> {
        if self.get_family(family_id)?.is_none() {
            return Err(SalescastError::NotFound {
                entity: "Family",
                id: family_id,
            });
        }
        if self.get_product(product_id)?.is_none() {
            return Err(SalescastError::NotFound {
                entity: "Product",
                id: product_id,
            });
        }

        self.conn.execute(
            "UPDATE products SET family_id = ?1 WHERE id = ?2",
            params![family_id, product_id],
        )?;
        Ok(())
    }

    /// Units sold for a product on or after `since`. 0 for unknown products.
    pub fn product_sales_since(&self, product_id: i64, since: NaiveDate) -> Result<i64> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM sales WHERE product_id = ?1 AND date >= ?2",
            params![product_id, since.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Units sold since the same calendar day one year before `today`
    pub fn product_sales_last_year(&self, product_id: i64, today: NaiveDate) -> Result<i64> {
        let one_year_ago = today.checked_sub_months(Months::new(12)).ok_or_else(|| {
            SalescastError::invalid_parameter("today", format!("{} has no prior year", today))
        })?;
        self.product_sales_since(product_id, one_year_ago)
    }

    /// Sale records, optionally restricted to one product, in date order.
    /// The product's current price is used as the unit price.
    pub fn sale_records(&self, product_id: Option<i64>) -> Result<Vec<SaleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.product_id, s.date, s.quantity, p.price
             FROM sales s
             JOIN products p ON p.id = s.product_id
             WHERE ?1 IS NULL OR s.product_id = ?1
             ORDER BY s.date ASC, s.id ASC",
        )?;

        let rows = stmt.query_map([product_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for (index, row) in rows.enumerate() {
            let (product_id, raw_date, quantity, unit_price) = row?;
            let timestamp =
                parse_sale_date(&raw_date).ok_or_else(|| SalescastError::Validation {
                    index,
                    product_id,
                    issue: ValidationIssue::MalformedTimestamp(raw_date.clone()),
                })?;
            records.push(SaleRecord {
                timestamp,
                product_id,
                quantity,
                unit_price,
            });
        }
        Ok(records)
    }

    pub fn product_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM products ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Insert a family, or return the existing one with that name
    pub fn add_family(&self, name: &str) -> Result<Family> {
        let (id, _) = get_or_create_family(&self.conn, name)?;
        Ok(Family {
            id,
            name: name.to_string(),
        })
    }

    pub fn add_product(&self, product: &Product) -> Result<()> {
        insert_product(&self.conn, product)
    }

    pub fn add_sale(&self, product_id: i64, date: NaiveDate, quantity: i64) -> Result<()> {
        insert_sale(&self.conn, product_id, date, quantity)
    }

    /// Import parsed rows in a single transaction.
    ///
    /// Families are created on first use. Products whose id already exists
    /// are skipped together with their sales.
    pub fn import(&mut self, rows: &[ProductRow]) -> Result<ImportSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = ImportSummary::default();

        for row in rows {
            let (family_id, created) = get_or_create_family(&tx, &row.family)?;
            if created {
                summary.families_created += 1;
            }

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)",
                [row.product_id],
                |r| r.get(0),
            )?;
            if exists {
                log::info!("product {} already exists, skipping", row.product_id);
                summary.products_skipped += 1;
                continue;
            }

            insert_product(
                &tx,
                &Product {
                    id: row.product_id,
                    name: row.name.clone(),
                    price: row.price,
                    family_id,
                },
            )?;
            summary.products_created += 1;

            for &(date, quantity) in &row.monthly_sales {
                insert_sale(&tx, row.product_id, date, quantity)?;
                summary.sales_inserted += 1;
            }
        }

        tx.commit()?;
        log::info!(
            "imported {} products ({} skipped), {} sales",
            summary.products_created,
            summary.products_skipped,
            summary.sales_inserted
        );
        Ok(summary)
    }
}

fn get_or_create_family(conn: &Connection, name: &str) -> Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM families WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    conn.execute("INSERT INTO families (name) VALUES (?1)", [name])?;
    Ok((conn.last_insert_rowid(), true))
}

fn insert_product(conn: &Connection, product: &Product) -> Result<()> {
    conn.execute(
        "INSERT INTO products (id, name, price, family_id) VALUES (?1, ?2, ?3, ?4)",
        params![product.id, product.name, product.price, product.family_id],
    )?;
    Ok(())
}

fn insert_sale(conn: &Connection, product_id: i64, date: NaiveDate, quantity: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO sales (product_id, date, quantity) VALUES (?1, ?2, ?3)",
        params![product_id, date.format(DATE_FORMAT).to_string(), quantity],
    )?;
    Ok(())
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339
fn parse_sale_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
