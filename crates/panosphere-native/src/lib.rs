//! Native desktop front-end for panosphere: the wgpu and OpenGL backends,
//! the winit drivers and the command line.

pub mod app;
pub mod backend;
pub mod cli;
pub mod input;
