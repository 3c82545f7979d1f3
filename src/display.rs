// src/display.rs

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Binds text to a named element of some output surface.
pub trait Sink {
    fn set_text(&mut self, element_id: &str, text: &str);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn set_text(&mut self, element_id: &str, text: &str) {
        (**self).set_text(element_id, text)
    }
}

/// Update both sinks.
impl<A: Sink, B: Sink> Sink for (A, B) {
    fn set_text(&mut self, element_id: &str, text: &str) {
        self.0.set_text(element_id, text);
        self.1.set_text(element_id, text);
    }
}

/// Prints every summary to a stream, stdout unless told otherwise.
#[derive(Debug)]
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
    write_errors: usize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            write_errors: 0,
        }
    }

    /// Number of summaries that could not be written.
    pub fn write_errors(&self) -> usize {
        self.write_errors
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn set_text(&mut self, element_id: &str, text: &str) {
        let written = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = written {
            self.write_errors += 1;
            warn!(element = element_id, error = %e, "console write failed");
        }
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>COVID-19 statistics</title>
<style>p { white-space: pre-line; }</style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Static HTML page with one paragraph per element, in the order first set.
#[derive(Debug, Default, Clone)]
pub struct HtmlPage {
    order: Vec<String>,
    texts: BTreeMap<String, String>,
}

impl HtmlPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, element_id: &str) -> Option<&str> {
        self.texts.get(element_id).map(String::as_str)
    }

    pub fn render(&self) -> String {
        let mut html = String::from(PAGE_HEAD);
        for id in &self.order {
            let text = self.texts.get(id).map(String::as_str).unwrap_or_default();
            html.push_str(&format!(
                "<p id=\"{}\">{}</p>\n",
                escape_html(id),
                escape_html(text)
            ));
        }
        html.push_str(PAGE_TAIL);
        html
    }

    /// Write `index.html` into `dir`, creating it if needed.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join("index.html");
        fs::write(&path, self.render())?;
        info!(path = %path.display(), "wrote page");
        Ok(path)
    }
}

impl Sink for HtmlPage {
    fn set_text(&mut self, element_id: &str, text: &str) {
        if !self.texts.contains_key(element_id) {
            self.order.push(element_id.to_string());
        }
        self.texts.insert(element_id.to_string(), text.to_string());
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_page_renders_elements_in_order() {
        let mut page = HtmlPage::new();
        page.set_text("confdata", "US on 1/23/20\n2\n");
        page.set_text("deathdata", "<b>&</b>");
        page.set_text("confdata", "US on 1/24/20\n3\n");

        let html = page.render();
        let conf = html.find("<p id=\"confdata\">US on 1/24/20\n3\n</p>").unwrap();
        let death = html.find("<p id=\"deathdata\">&lt;b&gt;&amp;&lt;/b&gt;</p>").unwrap();
        assert!(conf < death);
        assert_eq!(page.text("confdata"), Some("US on 1/24/20\n3\n"));
        assert_eq!(page.text("recdata"), None);
    }

    #[test]
    fn test_write_to() -> anyhow::Result<()> {
        let tmp = tempdir()?;
        let mut page = HtmlPage::new();
        page.set_text("recdata", "US on 1/23/20\n0\n");
        let path = page.write_to(tmp.path().join("site"))?;
        assert_eq!(path.file_name().unwrap(), "index.html");
        assert!(fs::read_to_string(path)?.contains("id=\"recdata\""));
        Ok(())
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_sink_writes_and_counts_failures() {
        let mut sink = ConsoleSink::with_writer(Vec::new());
        sink.set_text("confdata", "US on 1/23/20\n2\n");
        assert_eq!(sink.out, b"US on 1/23/20\n2\n");
        assert_eq!(sink.write_errors(), 0);

        let mut broken = ConsoleSink::with_writer(BrokenPipe);
        broken.set_text("confdata", "x");
        broken.set_text("deathdata", "y");
        assert_eq!(broken.write_errors(), 2);
    }

    #[test]
    fn test_pair_sink_updates_both() {
        let mut a = HtmlPage::new();
        let mut b = HtmlPage::new();
        (&mut a, &mut b).set_text("confdata", "x");
        assert_eq!(a.text("confdata"), Some("x"));
        assert_eq!(b.text("confdata"), Some("x"));
    }
}
