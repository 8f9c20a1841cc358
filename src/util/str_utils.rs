/// Writes `input` followed by enough spaces to make it `min_width` chars wide.
pub(crate) fn pad_to(output: &mut String, input: &str, min_width: usize) {
    output.push_str(input);
    let width = input.chars().count();
    if width < min_width {
        (width..min_width).for_each(|_| output.push(' '));
    }
}

/// Prefixes every line of `text`. Empty lines get the prefix without its trailing whitespace, so that `"> "` turns an
/// empty line into `">"`.
pub(crate) fn prefix_lines(text: &str, prefix: &str) -> String {
    let empty_line_prefix = prefix.trim_end();
    let mut out = String::with_capacity(text.len() + prefix.len() * 4);
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if line.is_empty() {
            out.push_str(empty_line_prefix);
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
    }
    out
}

/// Writes `marker` and then `text`, with every line after the first indented to line up under the first line's text.
///
/// ```text
/// 1. first line
///    second line
/// ```
pub(crate) fn hanging_indent(marker: &str, text: &str) -> String {
    let indent = " ".repeat(marker.chars().count());
    let mut out = String::with_capacity(text.len() + marker.len());
    out.push_str(marker);
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out
}

/// Joins the non-empty `parts` with `separator`.
pub(crate) fn join_non_empty<I, S>(parts: I, separator: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(separator);
        }
        out.push_str(part);
    }
    out
}
