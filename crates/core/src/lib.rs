pub mod annotation;
pub mod editor;
pub mod pipeline;
pub mod remote;
pub mod shared;
