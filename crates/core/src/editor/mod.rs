pub mod domain;
pub mod infrastructure;
pub mod region_editor;
