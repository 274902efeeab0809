use crate::core::markdown::contains_markdown;
use crate::core::message::{Message, Role};
use crate::ui::theme::Theme;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

#[derive(Clone, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}

fn base_style(role: Role, theme: &Theme) -> Style {
    match role {
        Role::User => theme.user_text_style,
        Role::Assistant => theme.assistant_text_style,
        Role::System => theme.system_text_style,
    }
}

fn flush_line(lines: &mut Vec<Line<'static>>, spans: &mut Vec<Span<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}

/// Lines for one message. Assistant text goes through the markdown renderer
/// only when it looks like markdown and rendering is enabled; everything
/// else is shown verbatim.
pub fn render_message(message: &Message, theme: &Theme, markdown_enabled: bool) -> Vec<Line<'static>> {
    let style = base_style(message.role, theme);
    let mut lines = if message.role.is_assistant()
        && markdown_enabled
        && contains_markdown(Some(&message.content))
    {
        render_markdown(&message.content, style, theme)
    } else {
        render_plain(&message.content, style)
    };

    if message.role.is_user() {
        let prefix = Span::styled("You: ", theme.user_prefix_style);
        match lines.first_mut() {
            Some(first) => first.spans.insert(0, prefix),
            None => lines.push(Line::from(prefix)),
        }
    }
    lines.push(Line::from(""));
    lines
}

pub fn render_plain(content: &str, style: Style) -> Vec<Line<'static>> {
    content
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                Line::from("")
            } else {
                Line::from(Span::styled(detab(line), style))
            }
        })
        .collect()
}

/// Render markdown into styled lines with pulldown-cmark.
pub fn render_markdown(content: &str, base: Style, theme: &Theme) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(content, options);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![base];
    let mut list_stack: Vec<ListKind> = Vec::new();
    let mut in_code_block = false;
    let mut quote_depth = 0usize;

    let current = |stack: &[Style]| stack.last().copied().unwrap_or(base);

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => {
                    if quote_depth > 0 {
                        spans.push(Span::styled("│ ".repeat(quote_depth), theme.quote_style));
                    }
                }
                Tag::Heading { .. } => {
                    flush_line(&mut lines, &mut spans);
                    style_stack.push(theme.heading_style);
                }
                Tag::BlockQuote(_) => {
                    flush_line(&mut lines, &mut spans);
                    quote_depth += 1;
                    style_stack.push(theme.quote_style);
                }
                Tag::List(start) => {
                    flush_line(&mut lines, &mut spans);
                    list_stack.push(match start {
                        Some(n) => ListKind::Ordered(n),
                        None => ListKind::Unordered,
                    });
                }
                Tag::Item => {
                    flush_line(&mut lines, &mut spans);
                    let indent = "  ".repeat(list_stack.len().saturating_sub(1));
                    let marker = match list_stack.last_mut() {
                        Some(ListKind::Ordered(n)) => {
                            let marker = format!("{indent}{n}. ");
                            *n += 1;
                            marker
                        }
                        _ => format!("{indent}• "),
                    };
                    spans.push(Span::styled(marker, theme.selected_style));
                }
                Tag::CodeBlock(kind) => {
                    flush_line(&mut lines, &mut spans);
                    in_code_block = true;
                    if let CodeBlockKind::Fenced(lang) = kind {
                        if !lang.is_empty() {
                            lines.push(Line::from(Span::styled(
                                format!("[{lang}]"),
                                theme.system_text_style,
                            )));
                        }
                    }
                }
                Tag::Emphasis => {
                    style_stack.push(current(&style_stack).add_modifier(Modifier::ITALIC))
                }
                Tag::Strong => style_stack.push(current(&style_stack).add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => {
                    style_stack.push(current(&style_stack).add_modifier(Modifier::CROSSED_OUT))
                }
                Tag::Link { .. } => {
                    style_stack.push(current(&style_stack).add_modifier(Modifier::UNDERLINED))
                }
                Tag::TableRow | Tag::TableHead => flush_line(&mut lines, &mut spans),
                Tag::TableCell => {
                    if !spans.is_empty() {
                        spans.push(Span::styled(" │ ", theme.system_text_style));
                    }
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Paragraph => {
                    flush_line(&mut lines, &mut spans);
                    if list_stack.is_empty() {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Heading(_) => {
                    flush_line(&mut lines, &mut spans);
                    lines.push(Line::from(""));
                    style_stack.pop();
                }
                TagEnd::BlockQuote(_) => {
                    flush_line(&mut lines, &mut spans);
                    quote_depth = quote_depth.saturating_sub(1);
                    style_stack.pop();
                }
                TagEnd::List(_) => {
                    flush_line(&mut lines, &mut spans);
                    list_stack.pop();
                    if list_stack.is_empty() {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Item => flush_line(&mut lines, &mut spans),
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    lines.push(Line::from(""));
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style_stack.pop();
                }
                TagEnd::TableHead | TagEnd::TableRow => flush_line(&mut lines, &mut spans),
                TagEnd::Table => {
                    flush_line(&mut lines, &mut spans);
                    lines.push(Line::from(""));
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}", detab(line)),
                            theme.code_style,
                        )));
                    }
                } else {
                    spans.push(Span::styled(detab(&text), current(&style_stack)));
                }
            }
            Event::Code(code) => spans.push(Span::styled(detab(&code), theme.code_style)),
            Event::SoftBreak => spans.push(Span::styled(" ", current(&style_stack))),
            Event::HardBreak => flush_line(&mut lines, &mut spans),
            Event::Rule => {
                flush_line(&mut lines, &mut spans);
                lines.push(Line::from(Span::styled("─".repeat(24), theme.system_text_style)));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                spans.push(Span::styled(marker, theme.selected_style));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                spans.push(Span::styled(html.to_string(), current(&style_stack)));
            }
            _ => {}
        }
    }

    flush_line(&mut lines, &mut spans);
    while lines.last().is_some_and(|line| line.width() == 0) {
        lines.pop();
    }
    lines
}
