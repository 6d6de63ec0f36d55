pub mod doi;
pub mod highlight;
pub mod summary;
pub mod user;

pub use doi::{Doi, InvalidDoi};
pub use highlight::{Highlight, HighlightChanges, HighlightContent, HighlightRegion, NewHighlight};
pub use summary::Summary;
pub use user::{NewUser, SanitizedUser, User, UserFlags, UserLookup};
