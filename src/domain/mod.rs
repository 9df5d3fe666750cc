//! Domain entities, value objects and the ports the application layer talks to.

pub mod activity;
pub mod ad;
pub mod booking;
pub mod message;
pub mod moderation;
pub mod money;
pub mod ports;
pub mod post;
pub mod profile;

use uuid::Uuid;

pub type UserId = Uuid;
pub type ActivityId = Uuid;
pub type PostId = Uuid;
pub type AdId = Uuid;
pub type BookingId = Uuid;
pub type ReportId = Uuid;
pub type ActionId = Uuid;
