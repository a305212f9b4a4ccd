//! Currency conversion: request validation and the `amount / rate` step.

pub mod engine;
pub mod types;

pub use engine::Converter;
pub use types::{Conversion, ConvertRequest, ConvertResponse, InvalidRequest};
