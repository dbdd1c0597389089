//! Markdown → ratatui `Text` renderer.
//!
//! Converts `pulldown_cmark` events into styled `Line`/`Span` values:
//! headings, emphasis, inline code, fenced code blocks (syntect), lists,
//! blockquotes, and links.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CODE_THEME: &str = "base16-ocean.dark";

/// Render markdown into owned styled text. `base_fg` is the color plain
/// prose takes, so the output blends with the surrounding message style.
pub fn render_markdown(content: &str, base_fg: Color) -> Text<'static> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);

    let mut renderer = Renderer::new(base_fg);
    for event in Parser::new_ext(content, opts) {
        renderer.handle(event);
    }
    renderer.out
}

struct Renderer {
    out: Text<'static>,
    base_fg: Color,
    /// Inline style stack. Styles compose via `patch` so nested
    /// bold-inside-italic works.
    styles: Vec<Style>,
    /// Prefix prepended to every emitted line (blockquote bar, code indent).
    prefixes: Vec<Span<'static>>,
    /// List nesting: None = bulleted, Some(n) = numbered at n.
    lists: Vec<Option<u64>>,
    highlighter: Option<HighlightLines<'static>>,
    in_code_block: bool,
    /// Link URL held until the link text closes.
    pending_link: Option<String>,
    /// Emit a blank separator line before the next block.
    separate_next_block: bool,
    /// Inside a table: cells are joined with a separator on one line.
    in_table_row: bool,
}

impl Renderer {
    fn new(base_fg: Color) -> Self {
        Self {
            out: Text::default(),
            base_fg,
            styles: Vec::new(),
            prefixes: Vec::new(),
            lists: Vec::new(),
            highlighter: None,
            in_code_block: false,
            pending_link: None,
            separate_next_block: false,
            in_table_row: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.base_fg))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn start_line(&mut self) {
        let mut line = Line::default();
        for pfx in &self.prefixes {
            line.spans.push(pfx.clone());
        }
        self.out.lines.push(line);
    }

    fn append(&mut self, span: Span<'static>) {
        if self.out.lines.is_empty() {
            self.start_line();
        }
        if let Some(line) = self.out.lines.last_mut() {
            line.push_span(span);
        }
    }

    fn separator(&mut self) {
        if self.separate_next_block {
            self.out.lines.push(Line::default());
            self.separate_next_block = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.emit_text(t),
            Event::Code(c) => {
                let style = Style::default().fg(Color::White).bg(Color::DarkGray);
                self.append(Span::styled(c.to_string(), style));
            }
            Event::SoftBreak => self.append(Span::raw(" ")),
            Event::HardBreak => self.start_line(),
            Event::Rule => {
                self.separator();
                self.out.lines.push(Line::from(Span::styled(
                    "─".repeat(32),
                    Style::default().fg(Color::DarkGray),
                )));
                self.separate_next_block = true;
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.in_table_row {
                    self.separator();
                    self.start_line();
                }
            }
            Tag::Heading { level, .. } => {
                self.separator();
                self.start_line();
                let style = heading_style(self.base_fg, level);
                let hashes = "#".repeat(heading_rank(level));
                self.append(Span::styled(format!("{hashes} "), style));
                // Heading text inherits the heading style
                self.push_style(style);
            }
            Tag::BlockQuote(_) => {
                self.separator();
                self.prefixes
                    .push(Span::styled("┃ ", Style::default().fg(Color::DarkGray)));
                self.push_style(Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Tag::CodeBlock(kind) => {
                self.separator();
                let lang = match &kind {
                    CodeBlockKind::Fenced(l) => l.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                let dim = Style::default().fg(Color::DarkGray);
                let header = if lang.is_empty() {
                    "──".to_string()
                } else {
                    format!("── {lang}")
                };
                self.out.lines.push(Line::from(Span::styled(header, dim)));
                self.prefixes.push(Span::raw("  "));

                if !lang.is_empty()
                    && let Some(syntax) = SYNTAX_SET.find_syntax_by_token(&lang)
                {
                    let theme = &THEME_SET.themes[CODE_THEME];
                    self.highlighter = Some(HighlightLines::new(syntax, theme));
                }
                self.in_code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.separator();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.start_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{indent}{n}. ");
                        *n += 1;
                        m
                    }
                    _ => format!("{indent}• "),
                };
                self.append(Span::styled(marker, Style::default().fg(Color::DarkGray)));
            }
            Tag::Table(_) => self.separator(),
            Tag::TableHead => {
                self.start_line();
                self.in_table_row = true;
                self.push_style(Style::default().add_modifier(Modifier::BOLD));
            }
            Tag::TableRow => {
                self.start_line();
                self.in_table_row = true;
            }
            Tag::TableCell => {}
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.pending_link = Some(dest_url.to_string());
                self.push_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.separate_next_block = true,
            TagEnd::Heading(_) => {
                self.pop_style();
                self.separate_next_block = true;
            }
            TagEnd::BlockQuote(_) => {
                self.prefixes.pop();
                self.pop_style();
                self.separate_next_block = true;
            }
            TagEnd::CodeBlock => {
                self.highlighter = None;
                self.in_code_block = false;
                self.prefixes.pop();
                self.out.lines.push(Line::from(Span::styled(
                    "──",
                    Style::default().fg(Color::DarkGray),
                )));
                self.separate_next_block = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.separate_next_block = true;
            }
            TagEnd::TableHead => {
                self.pop_style();
                self.in_table_row = false;
            }
            TagEnd::TableRow => self.in_table_row = false,
            TagEnd::TableCell => {
                self.append(Span::styled("  ", Style::default()));
            }
            TagEnd::Table => self.separate_next_block = true,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.pending_link.take() {
                    let style = Style::default().fg(Color::DarkGray);
                    self.append(Span::styled(format!(" ({url})"), style));
                }
            }
            _ => {}
        }
    }

    fn emit_text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");

        if let Some(mut hl) = self.highlighter.take() {
            for line in LinesWithEndings::from(&text) {
                let Ok(ranges) = hl.highlight_line(line, &SYNTAX_SET) else {
                    continue;
                };
                self.start_line();
                for (hl_style, fragment) in ranges {
                    let content = fragment.trim_end_matches('\n');
                    if content.is_empty() {
                        continue;
                    }
                    let fg = Color::Rgb(
                        hl_style.foreground.r,
                        hl_style.foreground.g,
                        hl_style.foreground.b,
                    );
                    self.append(Span::styled(content.to_owned(), Style::default().fg(fg)));
                }
            }
            self.highlighter = Some(hl);
            return;
        }

        if self.in_code_block {
            let style = Style::default().fg(Color::White);
            for line in text.lines() {
                self.start_line();
                self.append(Span::styled(line.to_owned(), style));
            }
            return;
        }

        let style = self.style();
        self.append(Span::styled(text, style));
    }
}

fn heading_style(base_fg: Color, level: HeadingLevel) -> Style {
    let base = Style::default().fg(base_fg).add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base,
        _ => base.add_modifier(Modifier::ITALIC),
    }
}

fn heading_rank(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn heading_text_inherits_heading_style() {
        let text = render_markdown("## Hello", Color::Blue);
        let line = &text.lines[0];
        assert!(line.spans.len() >= 2, "expected >= 2 spans, got {line:?}");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[1].style.fg, Some(Color::Blue));
    }

    #[test]
    fn bold_text_is_bold() {
        let text = render_markdown("Some **bold** text", Color::Blue);
        let bold = text.lines[0]
            .spans
            .iter()
            .find(|s| s.content == "bold")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn inline_code_styled() {
        let text = render_markdown("Use `foo()` here", Color::Blue);
        let code = text.lines[0]
            .spans
            .iter()
            .find(|s| s.content == "foo()")
            .unwrap();
        assert_eq!(code.style.fg, Some(Color::White));
        assert_eq!(code.style.bg, Some(Color::DarkGray));
    }

    #[test]
    fn code_block_has_header_and_footer() {
        let text = render_markdown("```\nline1\nline2\n```", Color::Blue);
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(rendered[0].starts_with("──"), "got {:?}", rendered[0]);
        assert!(rendered[1].contains("line1"));
        assert!(rendered[2].contains("line2"));
        assert!(rendered.last().unwrap().starts_with("──"));
    }

    #[test]
    fn fenced_language_appears_in_header() {
        let text = render_markdown("```rust\nfn main() {}\n```", Color::Blue);
        assert!(line_text(&text.lines[0]).contains("rust"));
    }

    #[test]
    fn list_items_get_markers() {
        let text = render_markdown("- one\n- two", Color::Blue);
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(rendered.iter().any(|l| l.starts_with("• ") && l.contains("one")));
        assert!(rendered.iter().any(|l| l.starts_with("• ") && l.contains("two")));
    }

    #[test]
    fn ordered_list_counts_up() {
        let text = render_markdown("1. first\n2. second", Color::Blue);
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(rendered.iter().any(|l| l.starts_with("1. ")));
        assert!(rendered.iter().any(|l| l.starts_with("2. ")));
    }

    #[test]
    fn link_url_follows_text() {
        let text = render_markdown("[docs](https://example.com)", Color::Blue);
        let rendered = line_text(&text.lines[0]);
        assert!(rendered.contains("docs"));
        assert!(rendered.contains("(https://example.com)"));
    }

    #[test]
    fn plain_text_uses_base_color() {
        let text = render_markdown("hello", Color::Green);
        assert_eq!(text.lines[0].spans[0].style.fg, Some(Color::Green));
    }

    #[test]
    fn blockquote_gets_bar_prefix() {
        let text = render_markdown("> quoted", Color::Blue);
        let rendered: Vec<String> = text.lines.iter().map(line_text).collect();
        assert!(rendered.iter().any(|l| l.starts_with("┃ ") && l.contains("quoted")));
    }
}
