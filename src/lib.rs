#![forbid(unsafe_code)]

pub mod assets;
pub mod compose;
pub mod config;
pub mod encode_ffmpeg;
pub mod error;
pub mod markup;
pub mod model;
pub mod pipeline;
pub mod text;

pub use compose::{FRAME_PATTERN, FrameComposer, FrameRGBA, frame_file_name};
pub use config::Config;
pub use encode_ffmpeg::{CancelToken, EncodeConfig};
pub use error::{KinreelError, KinreelResult};
pub use markup::{LineParse, parse_line, parse_markup, split_node_content};
pub use model::{Edge, Person};
pub use pipeline::{generate_frames, load_edges, render_video};
