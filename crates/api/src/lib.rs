//! Core of the Icinga 2 API client: request descriptors, the transport seam,
//! result views and the cached result set.
//!
//! ```text
//! ApiRequest ──► Transport::send ──► ApiResponse
//!                                        │ results()
//!                                        ▼
//!     CachedResultSet ──ensure_fresh──► ResultSet ──get──► QueryResult
//! ```

pub mod cache;
pub mod clock;
pub mod error;
pub mod mock;
pub mod path;
pub mod request;
pub mod response;
pub mod result;
pub mod result_set;
pub mod transport;

pub use cache::{CacheDuration, CachedResultSet, HoldGuard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ApiError;
pub use request::{ApiRequest, Method};
pub use response::{ApiResponse, ObjectOutcome};
pub use result::QueryResult;
pub use result_set::{slice_positions, OnMissing, ResultSet};
pub use transport::{execute, Transport};
