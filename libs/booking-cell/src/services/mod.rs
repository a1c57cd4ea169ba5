pub mod adapter;
pub mod booking;
pub mod calendar;
pub mod duplicate_guard;
pub mod ics;
pub mod notifications;
pub mod schedule;
pub mod slots;
pub mod window;

pub use booking::{BookingApi, BookingService, HttpBookingApi};
pub use duplicate_guard::BookedDatesIndex;
pub use notifications::{Notification, NotificationHub, NotificationLevel};
pub use schedule::{ActiveSelection, ScheduleSelector, SelectionState};
pub use slots::{generate_time_slot_labels, generate_time_slots, TimeSlots};
pub use window::BookingWindow;
