#![warn(missing_docs)]

//! G-code plumbing for the swaptower post-processor.
//!
//! This crate owns everything below the slicer dialect layer:
//! - splitting raw lines into a command part and a comment part
//! - recognizing tool changes, Z moves and extrusion moves
//! - reading a sliced file into lines and writing processed lines back out
//!
//! # Example
//!
//! ```no_run
//! use swaptower_gcode::{output_path, read_lines, tool_change_index, write_lines};
//!
//! let lines = read_lines("print.gcode")?;
//! let tool_changes = lines
//!     .iter()
//!     .filter_map(|l| l.command.as_deref())
//!     .filter(|cmd| tool_change_index(cmd).is_some())
//!     .count();
//! println!("{} tool changes", tool_changes);
//!
//! write_lines(output_path("print.gcode".as_ref()), &lines)?;
//! # Ok::<(), swaptower_gcode::GcodeError>(())
//! ```

pub mod command;
pub mod error;
pub mod file;
pub mod line;

pub use command::{
    is_extrusion_move, is_z_move, parse_move, tool_change_index, z_move, MoveArgs, ToolTracker,
};
pub use error::{GcodeError, Result};
pub use file::{output_path, parse_lines, read_lines, serialize_lines, write_lines};
pub use line::{classify, Line};
