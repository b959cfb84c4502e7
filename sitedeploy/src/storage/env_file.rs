//! Reading and rewriting the `DEPLOY_KEY` assignment of a `.env` file

/// Variable holding the deployment secret
pub const DEPLOY_KEY_VAR: &str = "DEPLOY_KEY";

/// A parsed `NAME=value` line
struct Assignment<'a> {
    export: bool,
    name: &'a str,
    value: &'a str,
}

fn parse_line(line: &str) -> Option<Assignment<'_>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (export, rest) = match trimmed.strip_prefix("export ") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let (name, value) = rest.split_once('=')?;

    Some(Assignment {
        export,
        name: name.trim(),
        value: unquote(value.trim()),
    })
}

/// Strip matching quotes, or a trailing ` # comment` from unquoted values
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    if value.starts_with('#') {
        return "";
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

/// The non-empty value assigned to `DEPLOY_KEY`, if any
pub fn find_deploy_key(contents: &str) -> Option<&str> {
    contents
        .lines()
        .filter_map(parse_line)
        .filter(|a| a.name == DEPLOY_KEY_VAR)
        .map(|a| a.value)
        .find(|v| !v.is_empty())
}

/// Return `contents` with every `DEPLOY_KEY` assignment set to `key`.
///
/// Appends an assignment when the file has none. Other lines are kept as-is.
pub fn set_deploy_key(contents: &str, key: &str) -> String {
    let mut out = String::with_capacity(contents.len() + key.len() + DEPLOY_KEY_VAR.len() + 2);
    let mut replaced = false;

    for line in contents.lines() {
        match parse_line(line) {
            Some(a) if a.name == DEPLOY_KEY_VAR => {
                if a.export {
                    out.push_str("export ");
                }
                out.push_str(DEPLOY_KEY_VAR);
                out.push('=');
                out.push_str(key);
                replaced = true;
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }

    if !replaced {
        out.push_str(DEPLOY_KEY_VAR);
        out.push('=');
        out.push_str(key);
        out.push('\n');
    }

    out
}
