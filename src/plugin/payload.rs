use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "plugin/grammar.pest"]
struct PayloadPairs;

/// A plugin invocation, split into its name and optional data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload<'a> {
    pub name: &'a str,
    pub data: Option<&'a str>,
}

impl<'a> Payload<'a> {
    /// Splits `name(data)` or `name data`. Returns `None` if the text doesn't start with a plugin name, or has
    /// unbalanced trailing text.
    pub fn parse(text: &'a str) -> Option<Self> {
        let mut pairs = match PayloadPairs::parse(Rule::payload, text) {
            Ok(pairs) => pairs,
            Err(err) => {
                log::debug!("couldn't parse plugin payload {text:?}: {err}");
                return None;
            }
        };
        let payload = pairs.next()?;
        let mut name = None;
        let mut data = None;
        for pair in payload.into_inner() {
            match pair.as_rule() {
                Rule::name => name = Some(pair.as_str()),
                Rule::call_data | Rule::spaced_data => data = Some(pair.as_str().trim()),
                _ => {}
            }
        }
        Some(Self {
            name: name?,
            data: data.filter(|d| !d.is_empty()),
        })
    }
}
