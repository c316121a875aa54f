pub mod framebuffer;
pub mod placeholder;

pub use framebuffer::Framebuffer;
pub use placeholder::{render_placeholder, write_placeholders};
