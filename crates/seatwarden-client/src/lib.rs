//! `seatwarden-client`: the library service as seen from one session.
//!
//! [`LibraryClient`] probes reservation state and the check-in countdown,
//! reserves a seat by locating and running the service's own reservation
//! script inside the sandbox, and cancels a held seat.

pub mod cancel;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod scrape;
pub mod session;

#[cfg(test)]
mod fake;

pub use client::{countdown_secs, format_countdown, LibraryClient, NO_DEADLINE};
pub use endpoints::Endpoints;
pub use error::{ClientError, Result};
pub use executor::select_reservation_script;
pub use session::{HttpSession, Session};
