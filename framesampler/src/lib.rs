pub mod batch;
pub mod frame_extractor;
pub mod sampler;
