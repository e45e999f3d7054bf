pub mod ffmpeg;
pub mod sink;
