use super::escape::push_escaped_str;
use super::inline::render_inline;

const FENCE: &str = "```";

fn is_fence_close(line: &str) -> bool {
    let t = line.trim();
    t.len() >= FENCE.len() && t.chars().all(|c| c == '`')
}

/// Info string of an opening fence, if the line is one
fn fence_open(line: &str) -> Option<&str> {
    let info = line.trim_start().strip_prefix(FENCE)?.trim();
    if info.contains('`') {
        None
    } else {
        Some(info)
    }
}

// Class names only ever carry a conservative character set.
fn code_language(info: &str) -> Option<&str> {
    let word = info.split_whitespace().next()?;
    word.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.' | '#'))
        .then_some(word)
}

fn header(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    Some((level, rest.trim()))
}

fn push_code_block(out: &mut String, info: &str, body: &[&str]) {
    match code_language(info) {
        Some(lang) => {
            out.push_str("<pre><code class=\"language-");
            out.push_str(lang);
            out.push_str("\">");
        }
        None => out.push_str("<pre><code>"),
    }
    for (i, line) in body.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        push_escaped_str(out, line);
    }
    out.push_str("</code></pre>");
}

/// Render document text to preview HTML.
///
/// Total over every input. Text lines are joined with `<br>`; headers and
/// fenced code blocks are block elements. Markers without a partner render as
/// literal text, and all user text is HTML-escaped.
pub fn render(content: &str) -> String {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    // next_close[i] is the first closing fence at or after line i.
    let mut next_close = vec![None; lines.len() + 1];
    for i in (0..lines.len()).rev() {
        next_close[i] = if is_fence_close(lines[i]) { Some(i) } else { next_close[i + 1] };
    }

    let mut out = String::with_capacity(content.len() + content.len() / 4);
    let mut after_text = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(info) = fence_open(line) {
            if let Some(close) = next_close[i + 1] {
                push_code_block(&mut out, info, &lines[i + 1..close]);
                after_text = false;
                i = close + 1;
                continue;
            }
        }

        if let Some((level, text)) = header(line) {
            out.push_str(&format!("<h{level}>"));
            render_inline(text, &mut out);
            out.push_str(&format!("</h{level}>"));
            after_text = false;
            i += 1;
            continue;
        }

        if after_text {
            out.push_str("<br>");
        }
        render_inline(line, &mut out);
        after_text = true;
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn empty_input() {
        assert_eq!(render(""), "");
    }

    #[test]
    fn plain_text_is_not_wrapped() {
        assert_eq!(render("hello"), "hello");
    }

    #[test]
    fn bold() {
        assert_eq!(render("**bold**"), "<strong>bold</strong>");
    }

    #[test]
    fn lines_are_joined_with_breaks() {
        assert_eq!(render("a\nb"), "a<br>b");
        assert_eq!(render("a\r\n\r\nb"), "a<br><br>b");
    }

    #[test]
    fn headers() {
        assert_eq!(render("# Title"), "<h1>Title</h1>");
        assert_eq!(render("###### *six*"), "<h6><em>six</em></h6>");
        assert_eq!(render("#"), "<h1></h1>");
        assert_eq!(render("####### seven"), "####### seven");
        assert_eq!(render("#hashtag"), "#hashtag");
        assert_eq!(render("intro\n## Part\nbody"), "intro<h2>Part</h2>body");
    }

    #[test]
    fn fenced_code() {
        assert_eq!(
            render("```rust\nlet x = *y* < 1;\n```"),
            "<pre><code class=\"language-rust\">let x = *y* &lt; 1;</code></pre>"
        );
        assert_eq!(render("```\n\n```"), "<pre><code></code></pre>");
        assert_eq!(
            render("```\"><script>\na\n```"),
            "<pre><code>a</code></pre>"
        );
    }

    #[test]
    fn unterminated_fence_is_text() {
        assert_eq!(render("```\n**x**"), "```<br><strong>x</strong>");
    }

    #[test]
    fn styles_do_not_cross_lines() {
        assert_eq!(render("**a\nb**"), "**a<br>b**");
    }

    fn only_known_tags(html: &str) -> bool {
        const ALLOWED: &[&str] = &[
            "br>", "strong>", "/strong>", "em>", "/em>", "del>", "/del>", "mark>", "/mark>",
            "pre>", "/pre>", "code>", "/code>", "code class=\"language-",
            "h1>", "h2>", "h3>", "h4>", "h5>", "h6>",
            "/h1>", "/h2>", "/h3>", "/h4>", "/h5>", "/h6>",
        ];
        html.match_indices('<')
            .all(|(i, _)| ALLOWED.iter().any(|tag| html[i + 1..].starts_with(tag)))
    }

    proptest! {
        #[test]
        fn render_is_total(source in any::<String>()) {
            let _ = render(&source);
        }

        #[test]
        fn render_is_deterministic(source in "[a-z*_~=#`\\\\ \n]{0,64}") {
            prop_assert_eq!(render(&source), render(&source));
        }

        #[test]
        fn markers_never_panic(source in "[*_~=#`\\\\<>&a \n]{0,128}") {
            let html = render(&source);
            prop_assert!(only_known_tags(&html));
        }

        #[test]
        fn user_markup_is_escaped(prefix in "[a-z* ]{0,8}", suffix in "[a-z* ]{0,8}") {
            let html = render(&format!("{prefix}<script>alert(1)</script>{suffix}"));
            prop_assert!(!html.contains("<script"));
            prop_assert!(only_known_tags(&html));
        }
    }
}
