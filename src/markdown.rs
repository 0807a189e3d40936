//! Minimal formatting pass over a (possibly still-streaming) reply buffer.
//!
//! `render_blocks` is a pure function of the buffer: the presentation layer
//! re-runs it on every growth of a streaming message and always gets a
//! deterministic block list. Only the subset of markdown the assistant
//! actually emits is handled — headings 1–3, list items, fenced code,
//! `**strong**` and `` `code` `` spans. No nesting, no escapes.

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(String),
    Code(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { spans: Vec<Span> },
    ListItem { spans: Vec<Span> },
    CodeBlock { language: String, lines: Vec<String> },
    Blank,
}

/// Renders the buffer into an ordered block list.
///
/// A fence opened but not yet closed when the buffer ends emits nothing for
/// the partial block: code in progress stays hidden rather than rendering
/// its lines as malformed paragraphs.
pub fn render_blocks(buffer: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut code_lines: Option<Vec<String>> = None;
    let mut code_language = String::new();

    for line in buffer.split('\n') {
        if line.starts_with(FENCE) {
            match code_lines.take() {
                None => {
                    code_language = line[FENCE.len()..].trim().to_string();
                    code_lines = Some(Vec::new());
                }
                Some(lines) => blocks.push(Block::CodeBlock {
                    language: std::mem::take(&mut code_language),
                    lines,
                }),
            }
            continue;
        }

        if let Some(lines) = code_lines.as_mut() {
            lines.push(line.to_string());
            continue;
        }

        if let Some(text) = line.strip_prefix("### ") {
            blocks.push(Block::Heading { level: 3, text: text.to_string() });
        } else if let Some(text) = line.strip_prefix("## ") {
            blocks.push(Block::Heading { level: 2, text: text.to_string() });
        } else if let Some(text) = line.strip_prefix("# ") {
            blocks.push(Block::Heading { level: 1, text: text.to_string() });
        } else if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            blocks.push(Block::ListItem { spans: format_inline(item) });
        } else if line.trim().is_empty() {
            blocks.push(Block::Blank);
        } else {
            blocks.push(Block::Paragraph { spans: format_inline(line) });
        }
    }

    blocks
}

/// Splits a line into plain/strong/code spans. A marker without a matching
/// closer passes through verbatim.
pub fn format_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        if let Some(body) = rest.strip_prefix("**") {
            // Strong runs to the next "**" and may not contain a bare '*'.
            if let Some(j) = body.find('*') {
                if j > 0 && body[j..].starts_with("**") {
                    flush(&mut spans, &mut plain);
                    spans.push(Span::Strong(body[..j].to_string()));
                    i += 2 + j + 2;
                    continue;
                }
            }
            plain.push('*');
            i += 1;
            continue;
        }

        if let Some(body) = rest.strip_prefix('`') {
            match body.find('`') {
                Some(j) if j > 0 => {
                    flush(&mut spans, &mut plain);
                    spans.push(Span::Code(body[..j].to_string()));
                    i += 1 + j + 1;
                    continue;
                }
                _ => {
                    plain.push('`');
                    i += 1;
                    continue;
                }
            }
        }

        // Copy plain text up to the next candidate marker in one go.
        match rest.find(['*', '`']) {
            Some(0) => {
                // A lone '*' that did not open a strong span.
                plain.push('*');
                i += 1;
            }
            Some(j) => {
                plain.push_str(&rest[..j]);
                i += j;
            }
            None => {
                plain.push_str(rest);
                i = text.len();
            }
        }
    }

    flush(&mut spans, &mut plain);
    spans
}

fn flush(spans: &mut Vec<Span>, plain: &mut String) {
    if !plain.is_empty() {
        spans.push(Span::Text(std::mem::take(plain)));
    }
}
