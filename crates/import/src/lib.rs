pub mod csv;
pub mod duplicates;
pub mod parse;
pub mod preview;
pub mod reconcile;
pub mod rules;
pub mod session;

pub use self::csv::{ColumnMapping, CsvStatementParser, StatementProfile};
pub use duplicates::find_duplicates;
pub use parse::{FileParser, ParseError, RawImportRecord};
pub use preview::TransactionCandidate;
pub use reconcile::CommitError;
pub use rules::{match_account, reorder, RuleSetEditor, SaveReport};
pub use session::{ImportSession, SessionError, SessionPhase};
