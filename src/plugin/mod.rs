//! Evaluation of `{{...}}` inline plugins.
//!
//! A plugin's payload is looked up by name in a fixed table. Each known plugin turns into a small tree of
//! [`PluginOutput`]s, which the formatters render in their own way. Unknown plugins are never an error: they render as
//! their payload, wrapped in a `plugin`-classed span.
mod payload;

pub use payload::Payload;

/// One piece of a plugin's rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginOutput {
    Text(String),
    Element {
        kind: PluginElement,
        children: Vec<PluginOutput>,
    },
    /// Markup to pass through to HTML-like output as-is. Formats that can't hold markup drop it.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginElement {
    Sup,
    Sub,
    /// An anchor that both names a location and links to it.
    Anchor(String),
    Span {
        class: &'static str,
    },
}

/// A chemical species that the formula plugins know about.
#[derive(Debug, PartialEq, Eq)]
pub struct Chemical {
    pub key: &'static str,
    pub formula: &'static str,
    pub english: &'static str,
}

pub const CHEMICALS: [Chemical; 10] = [
    Chemical {
        key: "co2",
        formula: "CO2",
        english: "carbon dioxide",
    },
    Chemical {
        key: "ch4",
        formula: "CH4",
        english: "methane",
    },
    Chemical {
        key: "n2o",
        formula: "N2O",
        english: "nitrous oxide",
    },
    Chemical {
        key: "o3",
        formula: "O3",
        english: "ozone",
    },
    Chemical {
        key: "h2o",
        formula: "H2O",
        english: "water",
    },
    Chemical {
        key: "sf6",
        formula: "SF6",
        english: "sulfur hexafluoride",
    },
    Chemical {
        key: "nh3",
        formula: "NH3",
        english: "ammonia",
    },
    Chemical {
        key: "so2",
        formula: "SO2",
        english: "sulfur dioxide",
    },
    Chemical {
        key: "no2",
        formula: "NO2",
        english: "nitrogen dioxide",
    },
    Chemical {
        key: "hfc134a",
        formula: "CH2FCF3",
        english: "1,1,1,2-tetrafluoroethane",
    },
];

impl Chemical {
    pub fn lookup(key: &str) -> Option<&'static Chemical> {
        CHEMICALS.iter().find(|chem| chem.key.eq_ignore_ascii_case(key))
    }

    /// The formula, with each run of digits as a subscript.
    pub fn render_formula(&self) -> Vec<PluginOutput> {
        let mut out = Vec::new();
        let mut rest = self.formula;
        while !rest.is_empty() {
            let is_digits = rest.starts_with(|c: char| c.is_ascii_digit());
            let run_len = rest
                .find(|c: char| c.is_ascii_digit() != is_digits)
                .unwrap_or(rest.len());
            let (run, after) = rest.split_at(run_len);
            if is_digits {
                out.push(element(PluginElement::Sub, vec![text(run)]));
            } else {
                out.push(text(run));
            }
            rest = after;
        }
        out
    }
}

/// The plugins, as resolved from their names.
#[derive(Debug, PartialEq, Eq)]
enum Plugin {
    Html,
    Anchor,
    Chemical(&'static Chemical),
    Squared,
    Cubed,
    Per,
    DegreeCelsius,
    Isotope,
    Unknown,
}

impl Plugin {
    fn lookup(name: &str) -> Self {
        match name {
            "html" => Plugin::Html,
            "anchor" => Plugin::Anchor,
            "sq" => Plugin::Squared,
            "cb" => Plugin::Cubed,
            "per" => Plugin::Per,
            "c_degree" => Plugin::DegreeCelsius,
            "iso" => Plugin::Isotope,
            other => Chemical::lookup(other).map_or(Plugin::Unknown, Plugin::Chemical),
        }
    }
}

/// Evaluates one plugin payload (the text between `{{` and `}}`).
pub fn apply(payload: &str) -> Vec<PluginOutput> {
    let Some(parsed) = Payload::parse(payload) else {
        return unknown(payload);
    };
    let rendered = match (Plugin::lookup(parsed.name), parsed.data) {
        (Plugin::Html, Some(raw)) => Some(vec![PluginOutput::Raw(raw.to_string())]),
        (Plugin::Anchor, Some(args)) => anchor(args),
        (Plugin::Chemical(chem), option) => Some(chemical(chem, option)),
        (Plugin::Squared, Some(unit)) => Some(with_exponent(unit, "2")),
        (Plugin::Cubed, Some(unit)) => Some(with_exponent(unit, "3")),
        (Plugin::Per, Some(unit)) => Some(with_exponent(unit, "-1")),
        (Plugin::DegreeCelsius, None) => Some(vec![text("°C")]),
        (Plugin::Isotope, Some(notation)) => Some(isotope(notation)),
        _ => None,
    };
    rendered.unwrap_or_else(|| unknown(payload))
}

/// Concatenates the text of some plugin output, dropping raw markup.
pub fn to_plain_text(outputs: &[PluginOutput]) -> String {
    let mut out = String::new();
    for output in outputs {
        match output {
            PluginOutput::Text(text) => out.push_str(text),
            PluginOutput::Element { children, .. } => out.push_str(&to_plain_text(children)),
            PluginOutput::Raw(_) => {}
        }
    }
    out
}

fn text(value: &str) -> PluginOutput {
    PluginOutput::Text(value.to_string())
}

fn element(kind: PluginElement, children: Vec<PluginOutput>) -> PluginOutput {
    PluginOutput::Element { kind, children }
}

fn unknown(payload: &str) -> Vec<PluginOutput> {
    log::debug!("unknown plugin: {payload:?}");
    vec![element(PluginElement::Span { class: "plugin" }, vec![text(payload)])]
}

fn anchor(args: &str) -> Option<Vec<PluginOutput>> {
    let (name, label) = match args.split_once(',') {
        Some((name, label)) => (name.trim(), label.trim()),
        None => (args.trim(), ""),
    };
    if name.is_empty() {
        return None;
    }
    let label = if label.is_empty() { "_" } else { label };
    Some(vec![element(PluginElement::Anchor(name.to_string()), vec![text(label)])])
}

fn chemical(chem: &Chemical, option: Option<&str>) -> Vec<PluginOutput> {
    match option {
        None | Some("cf") => chem.render_formula(),
        Some("en") => vec![text(chem.english)],
        Some("both") => {
            let mut out = vec![text(chem.english), text(" (")];
            out.extend(chem.render_formula());
            out.push(text(")"));
            out
        }
        Some(other) => {
            log::warn!("unknown option {other:?} for chemical {}; rendering its formula", chem.key);
            chem.render_formula()
        }
    }
}

fn with_exponent(base: &str, exponent: &str) -> Vec<PluginOutput> {
    vec![text(base), element(PluginElement::Sup, vec![text(exponent)])]
}

/// `13co2` is a mass number (`13`) and a molecule (`co2`).
fn isotope(notation: &str) -> Vec<PluginOutput> {
    let molecule = notation.trim_start_matches(|c: char| c.is_ascii_digit());
    let mass = &notation[..notation.len() - molecule.len()];
    let mut out = Vec::with_capacity(4);
    if !mass.is_empty() {
        out.push(element(PluginElement::Sup, vec![text(mass)]));
    }
    match Chemical::lookup(molecule) {
        Some(chem) => out.extend(chem.render_formula()),
        None => out.push(text(molecule)),
    }
    out
}
