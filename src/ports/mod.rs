pub mod catalog_gateway;
pub mod clock;
pub mod loan_ledger;
pub mod member_directory;

pub use catalog_gateway::CatalogGateway;
pub use clock::{Clock, SystemClock};
pub use loan_ledger::LoanLedger;
pub use member_directory::MemberDirectory;
