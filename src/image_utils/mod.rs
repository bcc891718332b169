pub mod background;
pub mod image_conversion;
pub mod image_io;
pub mod letterbox;
