//! Command recognizers: tool changes, moves and their arguments.
//!
//! All recognizers take the command part of a [`Line`](crate::Line), already
//! separated from its comment.

use std::sync::LazyLock;

use regex::bytes::Regex;

static TOOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^T([0-9])").expect("tool pattern"));
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^G1\s+").expect("move pattern"));
static X_RE: LazyLock<Regex> = LazyLock::new(|| axis_pattern('X'));
static Y_RE: LazyLock<Regex> = LazyLock::new(|| axis_pattern('Y'));
static Z_RE: LazyLock<Regex> = LazyLock::new(|| axis_pattern('Z'));
static E_RE: LazyLock<Regex> = LazyLock::new(|| axis_pattern('E'));
static F_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\sF(\d*\.?\d+)").expect("feed pattern"));

fn axis_pattern(axis: char) -> Regex {
    Regex::new(&format!(r"\s{}(-?\d*\.?\d+)", axis)).expect("axis pattern")
}

fn capture_f64(re: &Regex, cmd: &[u8]) -> Option<f64> {
    let caps = re.captures(cmd)?;
    std::str::from_utf8(caps.get(1)?.as_bytes())
        .ok()?
        .parse()
        .ok()
}

/// Arguments of a linear move (`G1`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveArgs {
    /// X coordinate.
    pub x: Option<f64>,
    /// Y coordinate.
    pub y: Option<f64>,
    /// Z coordinate.
    pub z: Option<f64>,
    /// Extruder distance.
    pub e: Option<f64>,
    /// Feed rate (units per minute).
    pub feed: Option<f64>,
}

/// Parse the arguments of a `G1` command. Returns `None` for any other command.
pub fn parse_move(cmd: &[u8]) -> Option<MoveArgs> {
    if !MOVE_RE.is_match(cmd) {
        return None;
    }
    Some(MoveArgs {
        x: capture_f64(&X_RE, cmd),
        y: capture_f64(&Y_RE, cmd),
        z: capture_f64(&Z_RE, cmd),
        e: capture_f64(&E_RE, cmd),
        feed: capture_f64(&F_RE, cmd),
    })
}

/// Target Z of a move that changes Z without moving in X or Y.
pub fn z_move(cmd: &[u8]) -> Option<f64> {
    let args = parse_move(cmd)?;
    match args {
        MoveArgs {
            x: None,
            y: None,
            z: Some(z),
            ..
        } => Some(z),
        _ => None,
    }
}

/// True if the command moves only the Z axis.
pub fn is_z_move(cmd: &[u8]) -> bool {
    z_move(cmd).is_some()
}

/// True if the command moves in X/Y while extruding a non-zero amount.
pub fn is_extrusion_move(cmd: &[u8]) -> bool {
    parse_move(cmd).is_some_and(|m| {
        (m.x.is_some() || m.y.is_some()) && m.e.is_some_and(|e| e != 0.0)
    })
}

/// Tool index selected by a `T<n>` command.
pub fn tool_change_index(cmd: &[u8]) -> Option<u8> {
    let caps = TOOL_RE.captures(cmd)?;
    let digit = caps.get(1)?.as_bytes().first()?;
    Some(digit - b'0')
}

/// Tracks the active tool across a sequence of commands.
///
/// After each recognized tool change, [`previous`](Self::previous) reports
/// the tool that was active before it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolTracker {
    active: Option<u8>,
    previous: Option<u8>,
}

impl ToolTracker {
    /// Start tracking with `initial` as the active tool.
    pub fn new(initial: Option<u8>) -> Self {
        Self {
            active: initial,
            previous: None,
        }
    }

    /// Classify a command, updating the active tool if it is a tool change.
    pub fn observe(&mut self, cmd: &[u8]) -> Option<u8> {
        let tool = tool_change_index(cmd)?;
        self.previous = self.active;
        self.active = Some(tool);
        Some(tool)
    }

    /// Currently active tool.
    pub fn active(&self) -> Option<u8> {
        self.active
    }

    /// Tool that was active before the most recent tool change.
    pub fn previous(&self) -> Option<u8> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tool_change_index() {
        assert_eq!(tool_change_index(b"T0"), Some(0));
        assert_eq!(tool_change_index(b"T3"), Some(3));
        assert_eq!(tool_change_index(b"G1 T1"), None);
        assert_eq!(tool_change_index(b"M104 S200 T1"), None);
    }

    #[test]
    fn test_z_move() {
        assert_relative_eq!(z_move(b"G1 Z5.500 F1500").unwrap(), 5.5);
        assert_relative_eq!(z_move(b"G1 Z.2").unwrap(), 0.2);
        assert!(is_z_move(b"G1 Z0.6"));
        assert!(!is_z_move(b"G1 X65.82 Y76.532 Z5.7 E0 F1500"));
        assert!(!is_z_move(b"G0 Z1"));
        assert!(!is_z_move(b"G1 E-2.5 F1500"));
    }

    #[test]
    fn test_parse_move() {
        let m = parse_move(b"G1 X80.349 Y81.849 E-2.5000 F2000").unwrap();
        assert_relative_eq!(m.x.unwrap(), 80.349);
        assert_relative_eq!(m.y.unwrap(), 81.849);
        assert_relative_eq!(m.e.unwrap(), -2.5);
        assert_relative_eq!(m.feed.unwrap(), 2000.0);
        assert!(m.z.is_none());
        assert!(parse_move(b"M83").is_none());
    }

    #[test]
    fn test_is_extrusion_move() {
        assert!(is_extrusion_move(b"G1 X80.349 Y81.849 E5 F2000"));
        assert!(!is_extrusion_move(b"G1 X80.349 Y81.849 E0"));
        assert!(!is_extrusion_move(b"G1 E-2.5"));
    }

    #[test]
    fn test_tool_tracker_previous() {
        let mut tracker = ToolTracker::new(Some(0));
        assert_eq!(tracker.observe(b"G1 X1 Y1"), None);
        assert_eq!(tracker.observe(b"T2"), Some(2));
        assert_eq!(tracker.previous(), Some(0));
        assert_eq!(tracker.observe(b"T1"), Some(1));
        assert_eq!(tracker.previous(), Some(2));
        assert_eq!(tracker.active(), Some(1));
    }
}
