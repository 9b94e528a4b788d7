pub mod catalog_gateway;
pub mod clock;
pub mod member_directory;

pub use catalog_gateway::CatalogGateway;
pub use clock::ManualClock;
pub use member_directory::MemberDirectory;
