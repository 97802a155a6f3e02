mod command;
mod desktop;
mod ffmpeg;
mod ytdl;

pub use desktop::{Desktop, DialogOutcome, NativeDesktop};
pub use ffmpeg::{Ffmpeg, StreamTransformer};
pub use ytdl::{StreamCatalog, Ytdl};
