pub mod booking;
pub mod event;
pub mod user;

pub use booking::{
    Booking, BookingOverride, DisplayFields, EventSnapshot, HolderSnapshot, NewBooking,
};
pub use event::{Capacity, Event, NewEvent};
pub use user::User;
