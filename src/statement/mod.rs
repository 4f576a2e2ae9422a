//! Bank-statement ingestion: PDF rows, header details, row normalisation and
//! transaction labels.

pub mod classification;
pub mod info;
pub mod pdf;
pub mod transactions;

pub use classification::{TransactionCategory, TransactionClassifier};
pub use info::{StatementInfo, StatementInfoExtractor};
pub use pdf::{validate_upload, RawTransactionRow, StatementDocument};
pub use transactions::Transaction;
