//! Turns the HTML that GitHub renders for comment bodies and previews into
//! styled terminal lines.
//!
//! Only the subset of markup GitHub emits for issue comments is understood.
//! Unknown tags are dropped and their text kept. Links are collected as
//! numbered references since the terminal cannot follow them inline.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const GITHUB_WEB: &str = "https://github.com";
const LINK: Color = Color::Cyan;
const CODE: Color = Color::Green;
const MUTED: Color = Color::DarkGray;

#[derive(Debug, Default)]
pub struct RenderedMarkup {
    pub lines: Vec<Line<'static>>,
    pub links: Vec<String>,
    /// Whether the body carried a collapsed email reply block.
    pub has_hidden_reply: bool,
}

impl RenderedMarkup {
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<String>>()
            .join("\n")
    }
}

/// Render `html`. Email reply blocks stay collapsed unless `expand_replies`.
pub fn render(html: &str, expand_replies: bool) -> RenderedMarkup {
    let mut state = RenderState::new(expand_replies);
    for token in Tokenizer::new(html) {
        state.handle(token);
    }
    state.finish()
}

/// Make an anchor's href usable outside the page it was rendered for.
/// Commit teasers carry links relative to the API host, so only their path is kept.
pub fn rewrite_href(href: &str, class: &str) -> String {
    if has_class(class, "commit-tease-sha") {
        return format!("{}{}", GITHUB_WEB, url_path(href));
    }
    if href.starts_with('/') && !href.starts_with("//") {
        return format!("{}{}", GITHUB_WEB, href);
    }
    href.to_string()
}

fn url_path(href: &str) -> &str {
    let Some((_, rest)) = href.split_once("://") else {
        return href;
    };
    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    };
    // pathname excludes query and fragment
    path.split(['?', '#']).next().unwrap_or(path)
}

fn has_class(class_attr: &str, name: &str) -> bool {
    class_attr.split_whitespace().any(|c| c == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            if let Some(after) = self.rest.strip_prefix("<!--") {
                self.rest = match after.find("-->") {
                    Some(end) => &after[end + 3..],
                    None => "",
                };
                continue;
            }

            if self.rest.starts_with('<') {
                let Some(end) = tag_end(self.rest) else {
                    let text = decode_entities(self.rest);
                    self.rest = "";
                    return Some(Token::Text(text));
                };
                let inner = &self.rest[1..end];
                self.rest = &self.rest[end + 1..];
                if inner.starts_with('!') || inner.starts_with('?') {
                    continue;
                }
                if let Some(name) = inner.strip_prefix('/') {
                    return Some(Token::End(name.trim().to_ascii_lowercase()));
                }
                return Some(parse_start_tag(inner));
            }

            let end = self.rest.find('<').unwrap_or(self.rest.len());
            let text = decode_entities(&self.rest[..end]);
            self.rest = &self.rest[end..];
            return Some(Token::Text(text));
        }
    }
}

/// Byte offset of the `>` closing the tag at the start of `input`. A `>`
/// inside a quoted attribute value does not count.
fn tag_end(input: &str) -> Option<usize> {
    let mut quote = None;
    for (idx, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

fn parse_start_tag(inner: &str) -> Token {
    let self_closing = inner.trim_end().ends_with('/');
    let inner = inner.trim_end().trim_end_matches('/');
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    let attrs = parse_attrs(&inner[name_end..]);
    Token::Start {
        name,
        attrs,
        self_closing,
    }
}

fn parse_attrs(mut input: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        input = input.trim_start();
        if input.is_empty() {
            break;
        }
        let key_end = input
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(input.len());
        let key = input[..key_end].to_ascii_lowercase();
        input = input[key_end..].trim_start();

        let value = if let Some(after_eq) = input.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(quote).unwrap_or(body.len());
                    input = body.get(close + 1..).unwrap_or("");
                    decode_entities(&body[..close])
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    input = &after_eq[end..];
                    decode_entities(&after_eq[..end])
                }
            }
        } else {
            String::new()
        };

        if !key.is_empty() {
            attrs.push((key, value));
        }
    }
    attrs
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let Some(semi) = tail.find(';').filter(|s| *s <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "br" | "img" | "hr" | "input" | "meta" | "link" | "wbr" | "source" | "col"
    )
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

struct RenderState {
    lines: Vec<Vec<Span<'static>>>,
    style_stack: Vec<Style>,
    links: Vec<String>,
    link_stack: Vec<Option<usize>>,
    lists: Vec<Option<u32>>,
    blockquote_depth: usize,
    pre_depth: usize,
    depth: usize,
    skip_until: Option<usize>,
    expand_replies: bool,
    has_hidden_reply: bool,
}

impl RenderState {
    fn new(expand_replies: bool) -> Self {
        Self {
            lines: vec![Vec::new()],
            style_stack: vec![Style::default()],
            links: Vec::new(),
            link_stack: Vec::new(),
            lists: Vec::new(),
            blockquote_depth: 0,
            pre_depth: 0,
            depth: 0,
            skip_until: None,
            expand_replies,
            has_hidden_reply: false,
        }
    }

    fn handle(&mut self, token: Token) {
        match token {
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let void = is_void(&name) || self_closing;
                if !void {
                    self.depth += 1;
                }
                if self.skip_until.is_some() {
                    return;
                }
                let class = attr(&attrs, "class").unwrap_or("");
                if has_class(class, "email-hidden-reply") {
                    self.has_hidden_reply = true;
                    if !self.expand_replies && !void {
                        self.skip_until = Some(self.depth);
                        self.push_span(Span::styled(
                            "[...]".to_string(),
                            Style::default().fg(MUTED),
                        ));
                        return;
                    }
                }
                if has_class(class, "email-hidden-toggle") && !void {
                    // the toggle itself is replaced by the reply marker
                    self.skip_until = Some(self.depth);
                    return;
                }
                self.start_tag(&name, &attrs);
            }
            Token::End(name) => {
                if is_void(&name) {
                    return;
                }
                let closing_depth = self.depth;
                self.depth = self.depth.saturating_sub(1);
                if let Some(skip) = self.skip_until {
                    if closing_depth == skip {
                        self.skip_until = None;
                    }
                    return;
                }
                self.end_tag(&name);
            }
            Token::Text(text) => {
                if self.skip_until.is_none() {
                    self.text(&text);
                }
            }
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &[(String, String)]) {
        match name {
            "p" => self.ensure_blank_line(),
            "div" | "details" | "summary" | "table" | "dl" | "dt" | "dd" => {
                self.ensure_line_break()
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.ensure_blank_line();
                self.push_style(heading_style(name));
            }
            "strong" | "b" => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            "em" | "i" => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            "del" | "s" => self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            "code" | "tt" => self.push_style(Style::default().fg(CODE)),
            "pre" => {
                self.ensure_line_break();
                self.pre_depth += 1;
                self.push_style(Style::default().fg(CODE));
            }
            "blockquote" => {
                self.ensure_line_break();
                self.blockquote_depth += 1;
                self.push_style(Style::default().fg(MUTED));
                self.push_prefix();
            }
            "ul" => {
                self.ensure_line_break();
                self.lists.push(None);
            }
            "ol" => {
                self.ensure_line_break();
                let start = attr(attrs, "start")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1);
                self.lists.push(Some(start));
            }
            "li" => {
                self.ensure_line_break();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}{}. ", indent, n);
                        *n += 1;
                        marker
                    }
                    _ => format!("{}- ", indent),
                };
                self.push_text_raw(&marker);
            }
            "a" => {
                let index = attr(attrs, "href").filter(|h| !h.is_empty()).map(|href| {
                    let class = attr(attrs, "class").unwrap_or("");
                    self.links.push(rewrite_href(href, class));
                    self.links.len()
                });
                self.link_stack.push(index);
                self.push_style(
                    Style::default()
                        .fg(LINK)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            "br" => self.new_line(),
            "hr" => {
                self.ensure_line_break();
                self.push_span(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(MUTED),
                ));
                self.new_line();
            }
            "img" => {
                let alt = attr(attrs, "alt").unwrap_or("image");
                self.push_span(Span::styled(
                    format!("[{}]", alt),
                    Style::default().fg(MUTED),
                ));
            }
            "input" => {
                if attr(attrs, "type") == Some("checkbox") {
                    let checked = attrs.iter().any(|(k, _)| k == "checked");
                    self.push_text_raw(if checked { "[x] " } else { "[ ] " });
                }
            }
            "tr" => self.ensure_line_break(),
            "td" | "th" => {
                if self.lines.last().is_some_and(|line| !line.is_empty()) {
                    self.push_text_raw(" | ");
                }
                if name == "th" {
                    self.push_style(Style::default().add_modifier(Modifier::BOLD));
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        match name {
            "p" | "div" | "details" | "summary" | "table" | "dl" | "dt" | "dd" | "tr" => {
                self.ensure_line_break()
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.pop_style();
                self.ensure_line_break();
            }
            "strong" | "b" | "em" | "i" | "del" | "s" | "code" | "tt" | "th" => {
                self.pop_style()
            }
            "pre" => {
                self.pre_depth = self.pre_depth.saturating_sub(1);
                self.pop_style();
                self.ensure_line_break();
            }
            "blockquote" => {
                if self.current_line_is_blank() {
                    if let Some(line) = self.lines.last_mut() {
                        line.clear();
                    }
                }
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.pop_style();
                self.ensure_line_break();
            }
            "ul" | "ol" => {
                self.lists.pop();
                self.ensure_line_break();
            }
            "a" => {
                self.pop_style();
                if let Some(Some(index)) = self.link_stack.pop() {
                    self.push_span(Span::styled(
                        format!("[{}]", index),
                        Style::default().fg(LINK),
                    ));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.pre_depth > 0 {
            let mut parts = text.split('\n').peekable();
            while let Some(part) = parts.next() {
                self.push_text_raw(part);
                if parts.peek().is_some() {
                    self.new_line();
                }
            }
            return;
        }

        let at_line_start = self.current_line_is_blank();
        let mut collapsed = String::with_capacity(text.len());
        let mut last_space = at_line_start
            || self
                .lines
                .last()
                .and_then(|line| line.last())
                .is_some_and(|span| span.content.ends_with(' '));
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    collapsed.push(' ');
                    last_space = true;
                }
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }
        self.push_text_raw(&collapsed);
    }

    fn finish(mut self) -> RenderedMarkup {
        for line in &mut self.lines {
            if let Some(last) = line.last_mut() {
                let trimmed = last.content.trim_end().to_string();
                last.content = trimmed.into();
            }
        }
        while self.lines.len() > 1 && self.lines.last().is_some_and(|l| line_is_blank(l)) {
            self.lines.pop();
        }
        while self.lines.len() > 1 && self.lines.first().is_some_and(|l| line_is_blank(l)) {
            self.lines.remove(0);
        }

        RenderedMarkup {
            lines: self.lines.into_iter().map(Line::from).collect(),
            links: self.links,
            has_hidden_reply: self.has_hidden_reply,
        }
    }

    fn current_line_is_blank(&self) -> bool {
        self.lines.last().map_or(true, |line| line_is_blank(line))
            || self.lines.last().is_some_and(|line| {
                let prefix = "| ".repeat(self.blockquote_depth);
                line.iter().map(|s| s.content.as_ref()).collect::<String>() == prefix
            })
    }

    fn ensure_line_break(&mut self) {
        if !self.current_line_is_blank() {
            self.new_line();
        }
    }

    fn ensure_blank_line(&mut self) {
        self.ensure_line_break();
        let previous_blank = self.lines.len() < 2
            || self
                .lines
                .get(self.lines.len() - 2)
                .is_some_and(|line| line_is_blank(line));
        if !previous_blank {
            self.new_line();
        }
    }

    fn new_line(&mut self) {
        self.lines.push(Vec::new());
        self.push_prefix();
    }

    fn push_prefix(&mut self) {
        if self.blockquote_depth > 0 && self.current_line_is_empty() {
            let prefix = "| ".repeat(self.blockquote_depth);
            self.push_span(Span::styled(prefix, Style::default().fg(MUTED)));
        }
    }

    fn current_line_is_empty(&self) -> bool {
        self.lines.last().map_or(true, |line| line.is_empty())
    }

    fn push_style(&mut self, style: Style) {
        let merged = self.current_style().patch(style);
        self.style_stack.push(merged);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_text_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.current_style();
        self.push_span(Span::styled(text.to_string(), style));
    }

    fn push_span(&mut self, span: Span<'static>) {
        match self.lines.last_mut() {
            Some(line) => line.push(span),
            None => self.lines.push(vec![span]),
        }
    }
}

fn line_is_blank(line: &[Span<'static>]) -> bool {
    line.iter().all(|span| span.content.trim().is_empty())
}

fn heading_style(name: &str) -> Style {
    match name {
        "h1" => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        "h2" => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        _ => Style::default().add_modifier(Modifier::BOLD),
    }
}
