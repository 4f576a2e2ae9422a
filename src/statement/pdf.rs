use crate::error::{AssistantError, Result};
use log::{debug, info};
use pdf_extract::extract_text;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Largest statement accepted for ingestion.
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Characters of the first page handed to header extraction.
pub const HEADER_CHARS: usize = 500;

/// One transaction line as printed on the statement, before any conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransactionRow {
    pub transaction_date: String,
    pub value_date: String,
    pub description: String,
    pub debit: String,
    pub credit: String,
    pub balance: String,
}

#[derive(Debug, Clone)]
pub struct StatementDocument {
    pages: Vec<String>,
}

fn row_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{2}/\d{2}/\d{4})\s+(\d{2}/\d{2}/\d{4})\s+(.*?)\s+(\d[\d,]*\.\d{2})\s+(\d[\d,]*\.\d{2})\s+(-?\d[\d,]*\.\d{2})$",
        )
        .expect("row regex")
    })
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("ws regex"))
}

fn normalize_line(raw: &str) -> String {
    ws_re().replace_all(raw.trim(), " ").to_string()
}

/// Rejects anything that is not a `.pdf` file within [`MAX_UPLOAD_BYTES`].
pub fn validate_upload(path: &Path) -> Result<()> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(AssistantError::InvalidInput(
            "Only PDF files are allowed".to_string(),
        ));
    }

    let size = std::fs::metadata(path)?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(AssistantError::InvalidInput(format!(
            "file is {} bytes, the limit is {} bytes",
            size, MAX_UPLOAD_BYTES
        )));
    }
    Ok(())
}

impl StatementDocument {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AssistantError::Pdf(format!(
                "PDF file not found: {}",
                path.display()
            )));
        }
        let text = extract_text(path)
            .map_err(|e| AssistantError::Pdf(format!("failed to read PDF text: {}", e)))?;
        let doc = Self::from_text(&text)?;
        info!("Read {} page(s) from {}", doc.pages.len(), path.display());
        Ok(doc)
    }

    /// Builds a document from already extracted text, pages separated by form
    /// feeds.
    pub fn from_text(text: &str) -> Result<Self> {
        let pages: Vec<String> = text
            .split('\u{000C}')
            .filter(|page| !page.trim().is_empty())
            .map(str::to_string)
            .collect();
        if pages.is_empty() {
            return Err(AssistantError::Pdf("empty PDF document".to_string()));
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn header_text(&self) -> String {
        self.pages[0].chars().take(HEADER_CHARS).collect()
    }

    /// Scans every page for transaction rows. Lines following a row are
    /// appended to its description until a blank line or the next row.
    pub fn transaction_rows(&self) -> Result<Vec<RawTransactionRow>> {
        let mut rows = Vec::new();
        let mut pending: Option<RawTransactionRow> = None;

        for page in &self.pages {
            for raw_line in page.lines() {
                let line = normalize_line(raw_line);
                if line.is_empty() {
                    rows.extend(pending.take());
                    continue;
                }

                if let Some(caps) = row_start_re().captures(&line) {
                    rows.extend(pending.take());
                    pending = Some(RawTransactionRow {
                        transaction_date: caps[1].to_string(),
                        value_date: caps[2].to_string(),
                        description: caps[3].to_string(),
                        debit: caps[4].to_string(),
                        credit: caps[5].to_string(),
                        balance: caps[6].to_string(),
                    });
                } else if let Some(row) = pending.as_mut() {
                    row.description.push(' ');
                    row.description.push_str(&line);
                }
            }
            // Rows never continue across a page break.
            rows.extend(pending.take());
        }

        if rows.is_empty() {
            return Err(AssistantError::Pdf("no transaction table found".to_string()));
        }
        debug!("Found {} transaction rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "STATE BANK OF EXAMPLE\nAccount Holder: A KUMAR\nCustomer ID: 88812\n\
Txn Date Value Date Description Debit Credit Balance\n\
01/04/2024 01/04/2024 OPENING CREDIT SALARY 0.00 50,000.00 50,000.00\n\
03/04/2024 03/04/2024 PCA:5000944243 KFC RESTAURANT 450.00 0.00 49,550.00\n\
SWIGGY DELIVERY\n\
\n\
Page 1 of 2\u{000C}05/04/2024 06/04/2024 INDIAN OIL FUEL 2,000.00 0.00 47,550.00\n";

    #[test]
    fn test_rows_with_continuation_lines() {
        let doc = StatementDocument::from_text(SAMPLE).unwrap();
        assert_eq!(doc.pages().len(), 2);

        let rows = doc.transaction_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].credit, "50,000.00");
        assert_eq!(
            rows[1].description,
            "PCA:5000944243 KFC RESTAURANT SWIGGY DELIVERY"
        );
        assert_eq!(rows[1].debit, "450.00");
        assert_eq!(rows[2].value_date, "06/04/2024");
        assert_eq!(rows[2].balance, "47,550.00");
    }

    #[test]
    fn test_header_text_is_truncated() {
        let long = "x".repeat(2 * HEADER_CHARS);
        let doc = StatementDocument::from_text(&long).unwrap();
        assert_eq!(doc.header_text().chars().count(), HEADER_CHARS);
        let doc = StatementDocument::from_text(SAMPLE).unwrap();
        assert!(doc.header_text().starts_with("STATE BANK OF EXAMPLE"));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(
            StatementDocument::from_text(" \u{000C}\n"),
            Err(AssistantError::Pdf(_))
        ));
        let doc = StatementDocument::from_text("just a cover letter").unwrap();
        assert!(doc.transaction_rows().is_err());
    }

    #[test]
    fn test_validate_upload() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("statement.PDF");
        std::fs::File::create(&pdf)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        assert!(validate_upload(&pdf).is_ok());

        let txt = dir.path().join("statement.txt");
        std::fs::write(&txt, "hello").unwrap();
        assert!(matches!(
            validate_upload(&txt),
            Err(AssistantError::InvalidInput(_))
        ));

        assert!(validate_upload(&dir.path().join("missing.pdf")).is_err());
    }
}
