//! # services
//!
//! Use-case layer. Each service owns the ports it needs and nothing else;
//! HTTP adapters call into these and never touch repositories directly.

pub mod accounts;
pub mod booking;
pub mod dashboard;
pub mod inbox;
pub mod messages;
pub mod properties;
pub mod saved;

pub use accounts::{AccountService, PasswordChange, Registration};
pub use booking::{BookingCommand, BookingService, CreatedBooking};
pub use dashboard::DashboardService;
pub use inbox::InboxService;
pub use messages::{MessageService, OutgoingMessage};
pub use properties::{ImageUpload, PropertyService};
pub use saved::SavedPropertyService;
