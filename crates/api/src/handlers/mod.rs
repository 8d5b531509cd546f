pub mod collages;
pub mod live;
pub mod styles;
pub mod uploads;
