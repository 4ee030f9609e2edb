//! Reads the donation platform's ticket export into [`TicketEntry`] values.
//!
//! Expected header:
//! `PaymentID, Donor Name, First Name, Last Name, Email, Date, Item Name,
//! Item Price, Item Fundraising Type, Quantity, Total Item Amount`.
//! Only `Item Name`, `Donor Name` and `Quantity` are used; values are passed
//! through untouched and validated by the engine.

use crate::error::ExportError;
use crate::types::TicketEntry;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const HEADER_MARKER: &str = "PaymentID";

#[derive(Deserialize)]
struct PurchaseRow {
    #[serde(rename = "Item Name")]
    item_name: String,
    #[serde(rename = "Donor Name")]
    donor_name: String,
    #[serde(rename = "Quantity")]
    quantity: String,
}

/// Opens `path` and reads it with [`read_entries`]; an open failure names the path.
pub fn read_entries_from(path: &Path) -> Result<Vec<TicketEntry>, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::File {
        path: path.to_path_buf(),
        source,
    })?;
    read_entries(file)
}

pub fn read_entries<R: Read>(reader: R) -> Result<Vec<TicketEntry>, ExportError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = csv.headers()?.clone();

    let mut entries = Vec::new();
    for record in csv.records() {
        let record = record?;
        // exports glued together repeat their header row
        if record.get(0).map(str::trim) == Some(HEADER_MARKER) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: PurchaseRow = record.deserialize(Some(&headers))?;

        let quantity = row
            .quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| ExportError::Quantity {
                line,
                value: row.quantity.clone(),
            })?;

        entries.push(TicketEntry {
            prize: row.item_name,
            buyer: row.donor_name,
            quantity,
        });
    }
    Ok(entries)
}
