use crate::error::ExportError;
use crate::types::*;
use candid::{Decode, Encode};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const AUDIT_HEADER: [&str; 3] = ["Prize", "Person", "Ticket Count"];
pub const WINNERS_HEADER: [&str; 2] = ["Prize", "Winner"];

/// One row per (prize, buyer), prize-then-buyer in first-seen order.
pub fn audit_rows(summary: &TicketSummary) -> Vec<AuditRow> {
    summary
        .prizes
        .iter()
        .flat_map(|prize| {
            prize.buyers.iter().map(move |b| AuditRow {
                prize: prize.prize.clone(),
                buyer: b.buyer.clone(),
                tickets: b.tickets,
            })
        })
        .collect()
}

pub fn winner_rows(result: &DrawResult) -> Vec<WinnerRow> {
    result
        .winners
        .iter()
        .map(|w| WinnerRow {
            prize: w.prize.clone(),
            winner: w.buyer.clone(),
        })
        .collect()
}

pub fn write_audit_csv<W: Write>(writer: W, summary: &TicketSummary) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(AUDIT_HEADER)?;
    for row in audit_rows(summary) {
        csv.write_record([row.prize, row.buyer, row.tickets.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_winners_csv<W: Write>(writer: W, result: &DrawResult) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(WINNERS_HEADER)?;
    for row in winner_rows(result) {
        csv.write_record([row.prize, row.winner])?;
    }
    csv.flush()?;
    Ok(())
}

/// Creates (or truncates) an artifact file; failures name the path.
pub fn create_sink(path: &Path) -> Result<BufWriter<File>, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

pub fn to_json(result: &DrawResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn to_candid(result: &DrawResult) -> Result<Vec<u8>, ExportError> {
    Ok(Encode!(result)?)
}

pub fn from_candid(bytes: &[u8]) -> Result<DrawResult, ExportError> {
    Ok(Decode!(bytes, DrawResult)?)
}
