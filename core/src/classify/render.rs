use super::types::{ReportingMode, RuleMatch};

/// Renders a rule match for the given reporting mode.
pub fn render_match(rule: &str, m: &RuleMatch, mode: ReportingMode) -> String {
    match mode {
        ReportingMode::Local => render_local(rule, m),
        ReportingMode::Vso => render_vso(m),
    }
}

fn render_local(rule: &str, m: &RuleMatch) -> String {
    let mut out = format!("[{}] ", rule);
    if let Some(loc) = &m.location {
        out.push_str(&format!("{}({},{}): ", loc.file, loc.line, loc.column));
    }
    out.push_str(m.severity.as_str());
    if let Some(code) = &m.code {
        out.push(' ');
        out.push_str(code);
    }
    out.push_str(": ");
    out.push_str(&m.text);
    out
}

fn render_vso(m: &RuleMatch) -> String {
    let mut props = format!("type={};", m.severity.as_str());
    if let Some(loc) = &m.location {
        props.push_str(&format!(
            "sourcepath={};linenumber={};columnnumber={};",
            escape_property(&loc.file),
            loc.line,
            loc.column
        ));
    }
    if let Some(code) = &m.code {
        props.push_str(&format!("code={};", escape_property(code)));
    }
    format!("##vso[task.logissue {}]{}", props, escape_data(&m.text))
}

/// Logging command property values must not contain the `;` and `]`
/// delimiters.
fn escape_property(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("%3B"),
            ']' => out.push_str("%5D"),
            _ => push_data_char(&mut out, c),
        }
    }
    out
}

fn escape_data(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        push_data_char(&mut out, c);
    }
    out
}

fn push_data_char(out: &mut String, c: char) {
    match c {
        '%' => out.push_str("%25"),
        '\r' => out.push_str("%0D"),
        '\n' => out.push_str("%0A"),
        _ => out.push(c),
    }
}
