pub mod movie;
pub mod showtime;
