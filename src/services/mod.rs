pub mod directions;
pub mod itineraries;
pub mod recommendations;
mod upstream;
pub mod weather;
