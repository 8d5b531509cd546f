pub mod collage;
pub mod status;
