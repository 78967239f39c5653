pub mod image_style;

pub use image_style::{build_registry, ImageStyleDeriver, ResizeMode, StyleDefinition};
