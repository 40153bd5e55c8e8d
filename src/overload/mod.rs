//! Overload shedding for unroutable requests.
//!
//! # Data Flow
//! ```text
//! Request with no matching route
//!     → guard.rs (increment window counter)
//!         count ≤ threshold → 503 + fallback page (page.rs)
//!         count > threshold → 403, empty body
//! schedule.rs: one background task zeroes the counter every window
//! ```
//!
//! # Design Decisions
//! - Fixed window, not sliding: the counter is zeroed on a timer
//! - The 403 path never touches the page file
//! - Reconfiguring the threshold cancels the old reset task before starting a new one

pub mod guard;
pub mod page;
pub mod schedule;

pub use guard::{OverloadGuard, OverloadSnapshot};
pub use page::{FallbackPage, DEFAULT_PAGE};
pub use schedule::ResetSchedule;
