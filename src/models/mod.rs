pub mod itinerary;
pub mod session;
pub mod user;
