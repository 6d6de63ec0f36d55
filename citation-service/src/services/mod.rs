//! Services layer for citation-service.
//!
//! Token handling, identity resolution, the policy engine, the ownership
//! guard and the record services built on the store traits.

pub mod error;
mod highlights;
mod identity;
mod jwt;
pub mod metrics;
pub mod ownership;
pub mod policy;
pub mod store;
mod summaries;
mod users;

pub use error::ServiceError;
pub use highlights::HighlightService;
pub use identity::IdentityResolver;
pub use jwt::{JwtService, TokenClaims, TokenResponse};
pub use policy::{Action, PolicyEngine, Subject};
pub use summaries::{MockSummarizer, RemoteSummarizer, Summarizer, SummaryService};
pub use users::{Registration, UserService};
