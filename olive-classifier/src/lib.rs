//! On-device classifier for olive leaf and fruit diseases.
//!
//! The pipeline goes from an acquired image to a [`verdict::Verdict`]:
//! the image is decoded and normalized ([`service::prepare`]), packed into a
//! [`tensor::Tensor`] with the layout the model expects, executed by an
//! [`engine::InferenceEngine`] and finally interpreted against the class labels.
//!
//! The [`service::Service`] wires everything together, while the
//! [`screen::ScreenController`] drives one run at a time on behalf of a user interface.
pub mod acquire;
pub mod engine;
pub mod screen;
pub mod service;
pub mod tensor;
pub mod verdict;
