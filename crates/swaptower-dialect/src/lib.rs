#![warn(missing_docs)]

//! Slicer dialects and tower planning for multi-material G-code.
//!
//! This crate reads a sliced file as written by a supported slicer, splits
//! it into layers, recovers the print and per-tool settings from the
//! slicer's header annotations, and decides at which layers a purge tower
//! has to host tool changes and how many tool change slots it needs.
//!
//! # Example
//!
//! ```no_run
//! use swaptower_dialect::{process_file, ProcessConfig};
//!
//! let print = process_file("print.gcode", &ProcessConfig::default())?;
//! println!("{} layers, {} tower slots", print.layers.len(), print.max_slots);
//! for layer in print.filtered_layers() {
//!     println!("{:.2} {:?} x{}", layer.z, layer.action, layer.tower_slots);
//! }
//! # Ok::<(), swaptower_dialect::DialectError>(())
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod header;
pub mod layer;
pub mod normalize;
pub mod perimeter;
pub mod print;
pub mod prusa;
pub mod scan;
pub mod segment;
pub mod settings;
pub mod slots;

pub use config::{ProcessConfig, SUPPORTED_LAYER_HEIGHT};
pub use dialect::{dialect_for, process_file, process_lines, SlicerDialect, SlicerKind};
pub use error::{DialectError, Result};
pub use header::{extract_header, AnnotationKey, HeaderBuilder, HeaderSettings};
pub use layer::{Layer, LayerAction, LayerKind};
pub use normalize::{normalize_first_tool_change, FirstToolChange};
pub use perimeter::annotate_perimeter_rates;
pub use print::{LayerSummary, PrintSummary, ProcessedPrint};
pub use prusa::PrusaSlic3r;
pub use scan::{scan_print_settings, ToolUsage};
pub use segment::{segment_layers, LayerMarker};
pub use settings::{
    BedKind, MachineGeometry, PrintSettings, SlicerVersion, ToolSettings, WipeSetting,
};
pub use slots::{allocate_slots, plan_slots, SlotPlan, PROMOTION_STREAK};
