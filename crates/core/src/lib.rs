pub mod account;
pub mod envelope;
pub mod id;
pub mod rule;
pub mod transaction;

pub use account::Account;
pub use envelope::EnvelopeRef;
pub use id::{AccountId, EnvelopeId, RuleId, TransactionId};
pub use rule::MatchRule;
pub use transaction::{Transaction, TransactionDraft};
