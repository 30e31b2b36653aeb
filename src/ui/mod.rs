/// Presentation layer
///
/// - Stacked background/foreground image layers (slideshow.rs)
/// - Keyboard, mouse and touch mapping (input.rs)

pub mod input;
pub mod slideshow;
