//! Plain-text email bodies rendered as the HTML the email API expects.

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Blank-line separated blocks become paragraphs, single newlines `<br>`.
pub fn plain_text_to_html(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            let lines = block
                .lines()
                .map(escape_html)
                .collect::<Vec<_>>()
                .join("<br>");
            format!("<p>{lines}</p>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn tracking_pixel(url: &str) -> String {
    format!(
        r#"<img src="{}" width="1" height="1" alt="" style="display:none">"#,
        escape_html(url)
    )
}
