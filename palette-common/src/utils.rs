pub mod fsutils;
pub mod math;
pub mod plot;
pub mod time;
