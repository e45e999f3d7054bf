//! Drawing: the painter, double-buffered surfaces and every per-frame layer.

pub mod comets;
pub mod emitters;
pub mod frame;
pub mod icons;
pub mod painter;
pub mod surface;
pub mod words;
