mod error;
mod reader;
pub mod session;
pub mod simulated;
mod writer;

pub use error::{FailureClass, NfcError};
pub use reader::{
    decode_record, DecodedRecord, NdefRecord, TagEvent, TagEventStream, TagReader, TagReading,
};
pub use session::{ReaderSession, ScanContext};
pub use simulated::{Presented, SimulatedNfc};
pub use writer::TagWriter;
