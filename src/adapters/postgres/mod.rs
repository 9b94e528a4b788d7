pub mod catalog_gateway;
pub mod loan_ledger;
pub mod member_directory;

pub use catalog_gateway::CatalogGateway as PostgresCatalogGateway;
pub use loan_ledger::LoanLedger as PostgresLoanLedger;
pub use member_directory::MemberDirectory as PostgresMemberDirectory;
