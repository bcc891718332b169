use crate::error::ModelError;
use ort::session::Session;
use std::path::Path;

/// An onnxruntime inference session.
///
/// The detectors in this project are wrappers around an ONNX inference session that handles
/// running the model on hardware.
pub struct OrtInferenceSession {
    pub session: Session,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> Result<Self, ModelError> {
        if !model_path.exists() {
            return Err(ModelError::MissingModel(model_path.to_path_buf()));
        }
        let session = Session::builder()?.commit_from_file(model_path)?;
        Ok(Self { session })
    }
}
