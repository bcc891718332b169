pub mod detection_pipeline;
