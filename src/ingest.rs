//! Order record ingestion from uploaded CSV files.
//!
//! Parses a tabular byte stream with a fixed, required header schema into an
//! ordered sequence of [`OrderRecord`]s. Ingestion is all-or-nothing: the
//! first malformed row aborts the whole file with a
//! [`AppError::MalformedRecord`] naming the offending row, and no partial
//! sequence is produced.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Required header columns, in the order they appear in the upload template.
pub const REQUIRED_HEADERS: &[&str] = &[
    "Quantity",
    "Product ID",
    "First Name",
    "Last Name",
    "Phone",
    "Address1",
    "Address2",
    "City",
    "Province",
    "Zip",
    "Financial Status",
];

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Customer identity attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Single billing/shipping address carried by an order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    /// Second address line; an empty CSV cell maps to `None`.
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
}

/// One normalized row of ingested input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    /// Units ordered; always > 0 after ingestion.
    pub quantity: u32,
    /// Identifier of the product in the remote catalog.
    pub product_ref: u64,
    pub customer: Customer,
    pub address: Address,
    /// Opaque financial status, passed through verbatim to the remote API.
    pub payment_status: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Parses an uploaded CSV byte stream into order records, preserving input
/// row order.
///
/// # Errors
///
/// Returns [`AppError::MalformedRecord`] when the header row is missing a
/// required column, a required field is empty, or `Quantity`/`Product ID`
/// cannot be parsed as positive integers. Row numbers are 1-based and count
/// the header row.
pub fn parse_records(reader: impl Read) -> Result<Vec<OrderRecord>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::MalformedRecord {
            row: 1,
            message: format!("unreadable header row: {e}"),
        })?
        .clone();

    // Map each required column to its position, failing on the first one
    // the upload does not carry.
    let mut columns = Vec::with_capacity(REQUIRED_HEADERS.len());
    for name in REQUIRED_HEADERS {
        let idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::MalformedRecord {
                row: 1,
                message: format!("missing required column '{name}'"),
            })?;
        columns.push(idx);
    }

    let mut records = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        // +1 for the header row, +1 for 1-based numbering
        let row = (i + 2) as u64;
        let raw = result.map_err(|e| AppError::MalformedRecord {
            row,
            message: e.to_string(),
        })?;
        records.push(parse_row(&raw, &columns, row)?);
    }

    Ok(records)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Column positions within [`REQUIRED_HEADERS`].
const COL_QUANTITY: usize = 0;
const COL_PRODUCT: usize = 1;
const COL_FIRST_NAME: usize = 2;
const COL_LAST_NAME: usize = 3;
const COL_PHONE: usize = 4;
const COL_ADDRESS1: usize = 5;
const COL_ADDRESS2: usize = 6;
const COL_CITY: usize = 7;
const COL_PROVINCE: usize = 8;
const COL_ZIP: usize = 9;
const COL_FINANCIAL_STATUS: usize = 10;

fn parse_row(
    raw: &csv::StringRecord,
    columns: &[usize],
    row: u64,
) -> Result<OrderRecord, AppError> {
    let field = |col: usize| -> &str { raw.get(columns[col]).unwrap_or("") };

    let required = |col: usize| -> Result<String, AppError> {
        let value = field(col);
        if value.is_empty() {
            Err(AppError::MalformedRecord {
                row,
                message: format!("missing required field '{}'", REQUIRED_HEADERS[col]),
            })
        } else {
            Ok(value.to_string())
        }
    };

    let quantity: u32 =
        required(COL_QUANTITY)?
            .parse()
            .map_err(|_| AppError::MalformedRecord {
                row,
                message: format!("'{}' is not a valid quantity", field(COL_QUANTITY)),
            })?;
    if quantity == 0 {
        return Err(AppError::MalformedRecord {
            row,
            message: "quantity must be greater than 0".to_string(),
        });
    }

    let product_ref: u64 =
        required(COL_PRODUCT)?
            .parse()
            .map_err(|_| AppError::MalformedRecord {
                row,
                message: format!("'{}' is not a valid product id", field(COL_PRODUCT)),
            })?;

    let line2 = field(COL_ADDRESS2);
    let line2 = if line2.is_empty() {
        None
    } else {
        Some(line2.to_string())
    };

    Ok(OrderRecord {
        quantity,
        product_ref,
        customer: Customer {
            first_name: required(COL_FIRST_NAME)?,
            last_name: required(COL_LAST_NAME)?,
            phone: required(COL_PHONE)?,
        },
        address: Address {
            line1: required(COL_ADDRESS1)?,
            line2,
            city: required(COL_CITY)?,
            region: required(COL_PROVINCE)?,
            postal_code: required(COL_ZIP)?,
        },
        payment_status: required(COL_FINANCIAL_STATUS)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str =
        "Quantity,Product ID,First Name,Last Name,Phone,Address1,Address2,City,Province,Zip,Financial Status";

    fn csv_of(rows: &[&str]) -> Cursor<String> {
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        content.push('\n');
        Cursor::new(content)
    }

    #[test]
    fn parses_well_formed_rows_in_order() {
        let input = csv_of(&[
            "2,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid",
            "1,200,Grace,Hopper,555-0101,2 Oak Ave,Apt 4,Arlington,VA,22201,pending",
        ]);

        let records = parse_records(input).expect("well-formed file should parse");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].product_ref, 100);
        assert_eq!(records[0].customer.first_name, "Ada");
        assert_eq!(records[0].address.line2, None);
        assert_eq!(records[0].payment_status, "paid");
        assert_eq!(records[1].product_ref, 200);
        assert_eq!(records[1].address.line2, Some("Apt 4".to_string()));
        assert_eq!(records[1].address.region, "VA");
    }

    #[test]
    fn missing_required_field_fails_with_row_number() {
        let input = csv_of(&[
            "2,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid",
            "1,200,Grace,,555-0101,2 Oak Ave,,Arlington,VA,22201,pending",
        ]);

        let err = parse_records(input).expect_err("missing last name should fail");

        match err {
            AppError::MalformedRecord { row, message } => {
                assert_eq!(row, 3);
                assert!(message.contains("Last Name"), "got: {message}");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn non_integer_quantity_fails() {
        let input = csv_of(&["lots,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid"]);

        let err = parse_records(input).expect_err("non-integer quantity should fail");
        assert!(matches!(err, AppError::MalformedRecord { row: 2, .. }));
    }

    #[test]
    fn zero_quantity_fails() {
        let input = csv_of(&["0,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid"]);

        let err = parse_records(input).expect_err("zero quantity should fail");
        match err {
            AppError::MalformedRecord { row, message } => {
                assert_eq!(row, 2);
                assert!(message.contains("greater than 0"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn non_integer_product_ref_fails() {
        let input = csv_of(&["1,widget,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid"]);

        let err = parse_records(input).expect_err("non-integer product id should fail");
        assert!(matches!(err, AppError::MalformedRecord { row: 2, .. }));
    }

    #[test]
    fn missing_header_column_fails_naming_it() {
        let input = Cursor::new(
            "Quantity,Product ID,First Name,Last Name,Phone,Address1,Address2,City,Province,Zip\n\
             1,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701\n",
        );

        let err = parse_records(input).expect_err("missing column should fail");
        match err {
            AppError::MalformedRecord { row, message } => {
                assert_eq!(row, 1);
                assert!(message.contains("Financial Status"), "got: {message}");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let input = Cursor::new(
            "quantity,product id,first name,last name,phone,address1,address2,city,province,zip,financial status\n\
             1,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid\n",
        );

        let records = parse_records(input).expect("case-insensitive headers should parse");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn headers_only_yields_empty_sequence() {
        let input = csv_of(&[]);

        let records = parse_records(input).expect("headers-only file should parse");
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_row_produces_no_partial_sequence() {
        let input = csv_of(&[
            "2,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid",
            "bad,100,Ada,Lovelace,555-0100,1 Main St,,Springfield,IL,62701,paid",
        ]);

        assert!(parse_records(input).is_err());
    }
}
