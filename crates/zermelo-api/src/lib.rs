//! Client for the Zermelo school scheduling API (`{school}.zportal.nl`).
//!
//! Exchanges authorization codes for access tokens, fetches appointments
//! and announcements, and reshapes appointments into a sorted grid with
//! display dates and lesson periods.

pub mod client;
pub mod dates;
pub mod envelope;
pub mod error;
pub mod grid;
pub mod transport;
pub mod types;

pub use client::ScheduleClient;
pub use dates::DateWindow;
pub use error::ZermeloError;
pub use grid::{cancelled_classes, classes, grid_portion, teacher_classes, GridProcessor};
pub use transport::ApiTransport;
pub use types::{Announcement, Appointment, GridEntry, TokenResponse};
pub use zermelo_auth::{FileTokenStore, MemoryTokenStore, TokenStore};
