use std::sync::OnceLock;

use regex::Regex;

fn fence_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*```[A-Za-z0-9_-]*\s*$").expect("valid fence regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"))
}

/// Clean a raw model answer into text a strict JSON parser is likely to accept.
///
/// Never fails. Text without a `{ ... }` span comes back trimmed but otherwise
/// untouched. Applying it twice gives the same result as applying it once.
pub fn normalize_response(raw: &str) -> String {
    let unfenced = fence_line().replace_all(raw, "");
    let unfenced = unfenced.replace("```", "");

    let (Some(start), Some(end)) = (unfenced.find('{'), unfenced.rfind('}')) else {
        return raw.trim().to_string();
    };
    if end < start {
        return raw.trim().to_string();
    }

    let collapsed = whitespace_run().replace_all(&unfenced[start..=end], " ");

    let mut text = collapsed.into_owned();
    loop {
        let next = trailing_comma().replace_all(&text, "$1").into_owned();
        if next == text {
            break;
        }
        text = next;
    }

    text.trim().to_string()
}
