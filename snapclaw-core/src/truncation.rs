//! Output truncation policy for file reads and subprocess capture.

// ── Constants ───────────────────────────────────────────────────────────

/// Maximum characters of a file returned to the model in one read.
pub const MAX_FILE_CHARS: usize = 10_000;

/// Maximum characters of captured stdout returned per script run.
pub const MAX_STDOUT_CHARS: usize = 50_000;

/// Maximum characters of captured stderr returned per script run.
pub const MAX_STDERR_CHARS: usize = MAX_STDOUT_CHARS / 4;

// ── File content truncation ─────────────────────────────────────────────

/// Truncate file content to [`MAX_FILE_CHARS`] characters.
///
/// Content at or under the limit is returned unchanged, byte for byte. Longer
/// content is cut at exactly the limit and an informational marker naming the
/// file is appended; the marker does not count against the limit.
pub fn truncate_file_content(content: &str, display_path: &str) -> String {
    match content.char_indices().nth(MAX_FILE_CHARS) {
        None => content.to_string(),
        Some((byte_index, _)) => format!(
            "{}\n[...File \"{}\" truncated at {} characters]",
            &content[..byte_index],
            display_path,
            MAX_FILE_CHARS
        ),
    }
}

// ── Subprocess output truncation ────────────────────────────────────────

/// Truncate captured process output to `max_chars` characters.
///
/// Keeps the head and tail halves with a marker in between stating how much
/// was dropped. Character-based so multi-byte output never splits a code
/// point.
pub fn truncate_process_output(output: &str, max_chars: usize) -> String {
    let total = output.chars().count();
    if total <= max_chars {
        return output.to_string();
    }

    let half = max_chars / 2;
    let head_end = output
        .char_indices()
        .nth(half)
        .map(|(i, _)| i)
        .unwrap_or(output.len());
    let tail_start = output
        .char_indices()
        .nth(total - half)
        .map(|(i, _)| i)
        .unwrap_or(output.len());

    format!(
        "{}\n\n... [truncated {} characters] ...\n\n{}",
        &output[..head_end],
        total - max_chars,
        &output[tail_start..]
    )
}
