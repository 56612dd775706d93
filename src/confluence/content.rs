//! Markdown summary to Confluence storage format, plus page title derivation.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use regex::{Captures, Regex};
use tracing::debug;

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d.%m.%y", "%d/%m/%y"];
const MAX_TOPIC_CHARS: usize = 100;
const HEADER_SCAN_CHARS: usize = 200;
const DEFAULT_TOPIC: &str = "Meeting minutes";
const CODE_MARKER: char = '\u{0}';

/// Date and topic found in a summary document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeetingInfo {
    pub date: Option<String>,
    pub topic: Option<String>,
}

pub struct ContentProcessor {
    code_block: Regex,
    heading: Regex,
    table_separator: Regex,
    unordered_item: Regex,
    ordered_item: Regex,
    inline_code: Regex,
    bold_star: Regex,
    bold_underscore: Regex,
    italic_star: Regex,
    italic_underscore: Regex,
    link: Regex,
    date_label: Regex,
    topic_label: Regex,
    header_date: Regex,
    header_topic: Regex,
    topic_junk: Regex,
}

impl ContentProcessor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            code_block: Regex::new(r"(?s)```(\w+)?\n(.*?)\n```")?,
            heading: Regex::new(r"^(#{1,6})\s+(.+?)\s*$")?,
            table_separator: Regex::new(r"^\|[\s\-|:]+\|$")?,
            unordered_item: Regex::new(r"^\s*[-*+]\s+(.+)$")?,
            ordered_item: Regex::new(r"^\s*\d+\.\s+(.+)$")?,
            inline_code: Regex::new(r"`([^`\n]+)`")?,
            bold_star: Regex::new(r"\*\*(.+?)\*\*")?,
            bold_underscore: Regex::new(r"\b__(.+?)__\b")?,
            italic_star: Regex::new(r"\*([^*\n]+)\*")?,
            italic_underscore: Regex::new(r"\b_([^_\n]+)_\b")?,
            link: Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)")?,
            date_label: Regex::new(
                r"(?i)(?:дата|date):\s*(\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{4}-\d{2}-\d{2})",
            )?,
            topic_label: Regex::new(r"(?i)(?:тема|topic|subject):\s*\*?\*?\s*(.+)")?,
            header_date: Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{1,2}[./]\d{1,2}[./]\d{2,4})")?,
            header_topic: Regex::new(r"(?m)^#\s+(.+?)\s*$")?,
            topic_junk: Regex::new(r"[^\w\s\-.,()]+")?,
        })
    }

    /// Convert a Markdown document to Confluence storage format (XHTML).
    ///
    /// Fenced code blocks become `code` macros and are left untouched by the
    /// other rules. Text outside them is XML-escaped before conversion.
    pub fn markdown_to_storage(&self, markdown: &str) -> String {
        let normalized = markdown.replace("\r\n", "\n");

        let mut code_blocks = Vec::new();
        let without_code = self
            .code_block
            .replace_all(&normalized, |caps: &Captures| {
                let language = caps.get(1).map(|m| m.as_str());
                let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                code_blocks.push(code_macro(language, body));
                format!("\n{}{}{}\n", CODE_MARKER, code_blocks.len() - 1, CODE_MARKER)
            })
            .into_owned();

        let escaped = escape_xml(&without_code);
        let lines: Vec<&str> = escaped.split('\n').collect();

        let mut blocks: Vec<String> = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut open_list: Option<&'static str> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim();

            let list_item = self
                .unordered_item
                .captures(line)
                .map(|c| ("ul", c[1].to_string()))
                .or_else(|| {
                    self.ordered_item
                        .captures(line)
                        .map(|c| ("ol", c[1].to_string()))
                });

            if let Some((kind, text)) = list_item {
                flush_paragraph(&mut paragraph, &mut blocks);
                if open_list != Some(kind) {
                    close_list(&mut open_list, &mut blocks);
                    blocks.push(format!("<{}>", kind));
                    open_list = Some(kind);
                }
                blocks.push(format!("<li>{}</li>", self.inline(&text)));
                i += 1;
                continue;
            }
            close_list(&mut open_list, &mut blocks);

            if trimmed.is_empty() {
                flush_paragraph(&mut paragraph, &mut blocks);
                i += 1;
                continue;
            }

            if trimmed.starts_with(CODE_MARKER) {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(trimmed.to_string());
                i += 1;
                continue;
            }

            if let Some(caps) = self.heading.captures(trimmed) {
                flush_paragraph(&mut paragraph, &mut blocks);
                let level = caps[1].len();
                blocks.push(format!(
                    "<h{level}>{}</h{level}>",
                    self.inline(&caps[2]),
                    level = level
                ));
                i += 1;
                continue;
            }

            if is_table_row(trimmed)
                && lines
                    .get(i + 1)
                    .map(|next| self.table_separator.is_match(next.trim()))
                    .unwrap_or(false)
            {
                flush_paragraph(&mut paragraph, &mut blocks);
                let mut rows = vec![trimmed];
                i += 2;
                while i < lines.len() && is_table_row(lines[i].trim()) {
                    rows.push(lines[i].trim());
                    i += 1;
                }
                blocks.push(self.table(&rows));
                continue;
            }

            paragraph.push(self.inline(trimmed));
            i += 1;
        }
        close_list(&mut open_list, &mut blocks);
        flush_paragraph(&mut paragraph, &mut blocks);

        let mut output = blocks.join("\n");
        for (index, block) in code_blocks.iter().enumerate() {
            output = output.replace(&format!("{}{}{}", CODE_MARKER, index, CODE_MARKER), block);
        }

        debug!(
            "Converted {} chars of Markdown to {} chars of storage format",
            markdown.len(),
            output.len()
        );
        output
    }

    fn inline(&self, text: &str) -> String {
        let text = self.inline_code.replace_all(text, "<code>${1}</code>");
        let text = self.link.replace_all(&text, "<a href=\"${2}\">${1}</a>");
        let text = self.bold_star.replace_all(&text, "<strong>${1}</strong>");
        let text = self
            .bold_underscore
            .replace_all(&text, "<strong>${1}</strong>");
        let text = self.italic_star.replace_all(&text, "<em>${1}</em>");
        let text = self.italic_underscore.replace_all(&text, "<em>${1}</em>");
        text.into_owned()
    }

    fn table(&self, rows: &[&str]) -> String {
        let mut table = String::from("<table><tbody>");
        for (index, row) in rows.iter().enumerate() {
            let tag = if index == 0 { "th" } else { "td" };
            table.push_str("<tr>");
            for cell in split_cells(row) {
                table.push_str(&format!(
                    "<{tag}><p>{}</p></{tag}>",
                    self.inline(cell),
                    tag = tag
                ));
            }
            table.push_str("</tr>");
        }
        table.push_str("</tbody></table>");
        table
    }

    /// Find the meeting date and topic in a summary.
    ///
    /// Labelled `Date:` / `Topic:` lines win; otherwise the first date in the
    /// opening characters and the first level-one heading are used.
    pub fn extract_meeting_info(&self, content: &str) -> MeetingInfo {
        let mut date = self
            .date_label
            .captures(content)
            .map(|c| c[1].to_string());
        let mut topic = self
            .topic_label
            .captures(content)
            .map(|c| c[1].trim().trim_end_matches('*').trim().to_string())
            .filter(|t| !t.is_empty());

        if date.is_none() {
            let head: String = content.chars().take(HEADER_SCAN_CHARS).collect();
            date = self.header_date.captures(&head).map(|c| c[1].to_string());
        }

        if topic.is_none() {
            topic = self
                .header_topic
                .captures(content)
                .map(|c| c[1].to_string());
        }

        MeetingInfo { date, topic }
    }

    /// Build a `YYYY-MM-DD <topic>` page title.
    pub fn generate_page_title(
        &self,
        date: Option<&str>,
        topic: Option<&str>,
        fallback: Option<&str>,
    ) -> String {
        self.page_title_on(date, topic, fallback, Local::now().date_naive())
    }

    fn page_title_on(
        &self,
        date: Option<&str>,
        topic: Option<&str>,
        fallback: Option<&str>,
        today: NaiveDate,
    ) -> String {
        let date = date.and_then(parse_meeting_date).unwrap_or(today);

        let topic = topic
            .map(|t| {
                let cleaned = self.topic_junk.replace_all(t, "");
                cleaned.trim().chars().take(MAX_TOPIC_CHARS).collect::<String>()
            })
            .filter(|t| !t.is_empty())
            .or_else(|| fallback.map(str::to_string).filter(|f| !f.is_empty()))
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        format!("{} {}", date.format("%Y-%m-%d"), topic)
    }
}

/// Parse a date in one of the accepted day-first or ISO formats.
///
/// Four-digit-year formats only apply when the last component has four
/// digits, so `2.9.25` is read as 2025 rather than year 25.
pub fn parse_meeting_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let year_digits = value
        .rsplit(['.', '/'])
        .next()
        .map(|s| s.len())
        .unwrap_or(0);

    DATE_FORMATS
        .iter()
        .filter(|fmt| {
            if fmt.starts_with("%Y") || !fmt.ends_with("%Y") {
                true
            } else {
                year_digits == 4
            }
        })
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn code_macro(language: Option<&str>, body: &str) -> String {
    let body = body.replace("]]>", "]]]]><![CDATA[>");
    match language {
        Some(language) => format!(
            "<ac:structured-macro ac:name=\"code\"><ac:parameter ac:name=\"language\">{}</ac:parameter><ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body></ac:structured-macro>",
            language, body
        ),
        None => format!(
            "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body></ac:structured-macro>",
            body
        ),
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn is_table_row(line: &str) -> bool {
    line.len() > 1 && line.starts_with('|') && line.ends_with('|')
}

fn split_cells(row: &str) -> impl Iterator<Item = &str> {
    let inner = &row[1..row.len() - 1];
    inner.split('|').map(str::trim)
}

fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<String>) {
    if !paragraph.is_empty() {
        blocks.push(format!("<p>{}</p>", paragraph.join("\n")));
        paragraph.clear();
    }
}

fn close_list(open_list: &mut Option<&'static str>, blocks: &mut Vec<String>) {
    if let Some(kind) = open_list.take() {
        blocks.push(format!("</{}>", kind));
    }
}
