use clap::ValueEnum;
use fancy_regex::Regex;
use lazy_static::lazy_static;
use std::ops::Range;

/// Which bare tokens get rewritten into `[[...]]` link markup before block parsing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ValueEnum)]
pub enum AutoLink {
    /// Leave the text as written.
    #[default]
    Off,

    /// Link bare `http`, `https`, `ftp` and `mailto` URLs.
    Url,

    /// Link bare URLs, and also CamelCase words like `FrontPage`. A leading `^` (as in `^FrontPage`) opts a word out;
    /// the caret is removed.
    WikiName,
}

lazy_static! {
    static ref URL: Regex =
        Regex::new(r"(?:https?|ftp)://[A-Za-z0-9;/?:@&=+$,\-_.!~*()#%]+|mailto:[A-Za-z0-9@._+\-]+")
            .expect("internal error");
    static ref WIKI_NAME: Regex =
        Regex::new(r"(\^)?(?<![A-Za-z0-9])((?:[A-Z][a-z0-9]+){2,})(?![A-Za-z0-9])").expect("internal error");
}

/// The byte ranges of the bare URLs in `text`.
pub fn find_urls(text: &str) -> Vec<Range<usize>> {
    URL.find_iter(text)
        .map_while(Result::ok)
        .map(|found| found.start()..found.end())
        .collect()
}

/// Opening and closing tokens of the inline spans whose contents autolinking must not touch.
const PROTECTED: [(&str, &str); 3] = [("[[", "]]"), ("{{", "}}"), ("``", "``")];

impl AutoLink {
    /// Rewrites every line that can hold inline markup.
    ///
    /// Verbatim lines (inside `<<<`/`>>>` blocks, or starting with whitespace) and `//` comment lines pass through
    /// unchanged.
    pub fn apply_to_lines<S: AsRef<str>>(self, lines: &[S]) -> Vec<String> {
        let mut in_verbatim = false;
        lines
            .iter()
            .map(|line| {
                let line = line.as_ref();
                if in_verbatim {
                    if line.trim_end() == ">>>" {
                        in_verbatim = false;
                    }
                    return line.to_string();
                }
                if line.starts_with("<<<") {
                    in_verbatim = true;
                    return line.to_string();
                }
                if line.starts_with([' ', '\t']) || line.starts_with("//") {
                    return line.to_string();
                }
                self.apply(line)
            })
            .collect()
    }

    /// Rewrites a single line, leaving existing link, plugin and literal spans alone.
    pub fn apply(self, line: &str) -> String {
        if self == AutoLink::Off {
            return line.to_string();
        }
        let mut out = String::with_capacity(line.len() + 8);
        let mut remaining = line;
        while !remaining.is_empty() {
            let next_protected = PROTECTED
                .iter()
                .filter_map(|(open, close)| remaining.find(open).map(|at| (at, *open, *close)))
                .min_by_key(|(at, _, _)| *at);
            let Some((at, open, close)) = next_protected else {
                self.link_text(remaining, &mut out);
                break;
            };
            self.link_text(&remaining[..at], &mut out);
            let span = &remaining[at..];
            let span_len = match span[open.len()..].find(close) {
                Some(close_at) => open.len() + close_at + close.len(),
                None => span.len(),
            };
            out.push_str(&span[..span_len]);
            remaining = &span[span_len..];
        }
        out
    }

    fn link_text(self, text: &str, out: &mut String) {
        let mut last = 0;
        for url in find_urls(text) {
            self.link_words(&text[last..url.start], out);
            out.push_str("[[");
            out.push_str(&text[url.clone()]);
            out.push_str("]]");
            last = url.end;
        }
        self.link_words(&text[last..], out);
    }

    fn link_words(self, text: &str, out: &mut String) {
        if self != AutoLink::WikiName {
            out.push_str(text);
            return;
        }
        let mut last = 0;
        for caps in WIKI_NAME.captures_iter(text) {
            let Ok(caps) = caps else {
                break;
            };
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            if caps.get(1).is_some() {
                out.push_str(name.as_str());
            } else {
                out.push_str("[[");
                out.push_str(name.as_str());
                out.push_str("]]");
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
    }
}
