use terminal_size::{Width, terminal_size};

/// Used when stdout is not a terminal.
const FALLBACK_WIDTH: usize = 100;

/// The width of the terminal minus `margin`, for wrapping `--help`
/// output.
pub fn get_terminal_width(margin: usize) -> usize {
    match terminal_size() {
        Some((Width(width), _)) => usize::from(width).saturating_sub(margin),
        None => FALLBACK_WIDTH,
    }
}
