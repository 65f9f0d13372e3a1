pub mod coordinate_mapper;
pub mod frame_annotations;
