pub mod billboard;
pub mod calendar;
pub mod countdown;
pub mod grid;
pub mod locale;
