mod error;
mod line;
mod reader;

pub use error::ReaderError;
pub use line::{LogLine, decode_line};
pub(crate) use line::decode_lossy;
pub use reader::{Reader, TailStart, Tailer};
