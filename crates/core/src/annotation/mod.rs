pub mod annotation_store;
pub mod domain;
