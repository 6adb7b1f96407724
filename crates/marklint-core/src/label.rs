/// Matching key for a link label (the text between the brackets): interior
/// whitespace collapsed to one space, trimmed, Unicode case folded.
///
/// Folding goes through lower then upper case so that `ß`, `ẞ` and `SS`
/// share a key.
pub(crate) fn normalize_link_label(label: &str) -> String {
    let mut collapsed = String::with_capacity(label.len());
    let mut pending_space = false;
    for ch in label.chars() {
        if matches!(ch, ' ' | '\t' | '\n' | '\r') {
            pending_space = !collapsed.is_empty();
            continue;
        }
        if pending_space {
            collapsed.push(' ');
            pending_space = false;
        }
        collapsed.push(ch);
    }
    collapsed.to_lowercase().to_uppercase()
}
