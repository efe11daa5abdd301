/// Width of a tab when measuring indentation.
pub const TAB_STOP: usize = 4;

const BEGIN: &str = "{";
const END: &str = "}";

/// Indentation of `line`, or `None` when it holds only whitespace.
fn indentation(line: &str) -> Option<usize> {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / TAB_STOP + 1) * TAB_STOP,
            '\r' => {}
            _ => return Some(width),
        }
    }
    None
}

/// Rewrites indentation structure as explicit `{`/`}` lines.
///
/// A deeper line opens a block. A shallower line closes every open block whose
/// enclosing level is at least as deep as the new line. Blocks still open at
/// the end of the text are closed.
pub fn bracketify(source: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut levels: Vec<usize> = Vec::new();
    let mut current = 0;

    for line in source.split('\n').filter(|line| !line.is_empty()) {
        if let Some(indent) = indentation(line) {
            if indent > current {
                levels.push(current);
                out.push(BEGIN);
            } else if indent < current {
                while let Some(&top) = levels.last() {
                    if indent > top {
                        break;
                    }
                    levels.pop();
                    out.push(END);
                }
            }
            current = indent;
        }
        out.push(line);
    }
    out.extend(levels.iter().map(|_| END));

    let mut text = out.join("\n");
    text.push('\n');
    text
}
