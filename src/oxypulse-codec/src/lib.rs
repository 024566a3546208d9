#[macro_use]
extern crate serde;

mod error;
pub use error::CodecError;

mod helpers;

mod framer;
pub use framer::LineFramer;

mod sample;
pub use sample::{Field, RawSample};
