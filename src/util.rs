use crate::param::STATUS_CODES;

/// Builds small standalone HTML pages (error pages).
pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let reason = STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status");
        let title = format!("{} {}", code, reason);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code,
            note.unwrap_or(reason)
        );
        Self { title, css, body }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>"##,
            self.title, self.css, self.body
        )
    }
}

/// Escape the five HTML-significant characters so `value` can be embedded in
/// element content or a quoted attribute.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
