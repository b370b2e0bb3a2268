//! Minimal HTML rendering for the scenario dashboards.
//!
//! Pages are fixed templates; every dynamic value goes through [`escape`].

use axum::response::Html;

/// Escapes text for safe inclusion in HTML element content and attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps a body fragment into a complete page.
///
/// `style` is page-specific CSS appended to the shared base rules.
#[must_use]
pub fn page(title: &str, style: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; max-width: 900px; margin: 0 auto; padding: 20px; background: #f5f5f5; }}
        .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; border-radius: 10px; margin-bottom: 20px; text-align: center; }}
        .card {{ background: white; padding: 20px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); margin-bottom: 20px; }}
        .error {{ background: #f8d7da; color: #721c24; padding: 20px; border-radius: 10px; border-left: 4px solid #f5c6cb; margin-bottom: 20px; }}
        .ok {{ background: #d4edda; color: #155724; padding: 15px; border-radius: 10px; margin-bottom: 20px; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid #eee; }}
        button {{ border: none; border-radius: 5px; padding: 8px 15px; cursor: pointer; color: white; background: #667eea; }}
        {style}
    </style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape(title),
    ))
}

/// Renders the purple page header with a title, subtitle and pod line.
#[must_use]
pub fn header(title: &str, subtitle: &str, pod: &str) -> String {
    format!(
        r#"<div class="header">
    <h1>{}</h1>
    <p>{}</p>
    <p style="font-size: 0.9em; opacity: 0.8;">Pod: {}</p>
</div>"#,
        escape(title),
        escape(subtitle),
        escape(pod)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape("My Blog"), "My Blog");
    }

    #[test]
    fn page_escapes_title() {
        let Html(body) = page("<b>", "", "");
        assert!(body.contains("<title>&lt;b&gt;</title>"));
    }

    #[test]
    fn header_includes_pod() {
        assert!(header("App", "sub", "web-1").contains("Pod: web-1"));
    }
}
