pub mod editor_mode;
pub mod render_surface;
