/// Terminal width for clap's help formatting; a conservative default
/// when not connected to a terminal.
pub fn get_terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .unwrap_or(100)
}
