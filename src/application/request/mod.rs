mod admission;
mod dependencies;
mod errors;
mod overdue_scheduler;
mod queries;
mod transition;
mod view;

pub use admission::create_request;
pub use dependencies::{LoanPolicy, ServiceDependencies};
pub use errors::{RequestApplicationError, Result};
pub use overdue_scheduler::{DeadlineOutcome, OverdueScheduler, RetryPolicy};
pub use queries::{RequestFilter, get_request, list_requests};
pub use transition::act;
pub use view::{RequestDetail, describe_request};
