//! Toast document: element tree, XML serialization, descriptor assembly
//!
//! Layout produced by [`build`]:
//!
//! ```text
//! <toast activationType="protocol" launch="..." [duration] [scenario]>
//!   <visual><binding template="ToastGeneric">
//!     text*  image(icon)?  image?  progress?
//!   </binding></visual>
//!   <actions> input* (text | selection) then action* </actions>   (lazy, at most one)
//!   <audio src="..."/> | <audio silent="true"/>                  (at most one)
//! </toast>
//! ```

use std::fmt;

use tracing::debug;

use crate::error::BuildError;
use crate::options::{Attributes, ToastDescriptor};

/// Launch value used when no textual launch target is given
pub const DEFAULT_LAUNCH: &str = "http:";

/// Prefix of sounds the platform plays itself
pub const SYSTEM_SOUND_PREFIX: &str = "ms-winsoundevent:";

const VISUAL: usize = 0;
const BINDING: usize = 0;

/// Single XML element with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Set (or replace) an attribute; name must be a valid XML name
    pub fn set_attribute(&mut self, name: &str, value: &str) -> Result<(), BuildError> {
        if !is_xml_name(name) {
            return Err(BuildError::InvalidAttributeName {
                element: self.name.clone(),
                name: name.to_string(),
            });
        }
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn with_attributes(mut self, attrs: &Attributes) -> Result<Self, BuildError> {
        for (name, value) in attrs {
            self.set_attribute(name, &value.to_string())?;
        }
        Ok(self)
    }

    fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_into(v, out);
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            escape_into(text, out);
        }
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// XML Name production restricted to what toast schemas use
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | ':'))
}

/// Escape markup characters; characters XML 1.0 forbids become U+FFFD
fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\t' | '\n' | '\r' => out.push(c),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => out.push(char::REPLACEMENT_CHARACTER),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

/// Toast document rooted at `<toast>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Empty template: root with launch placeholder and an empty binding
    pub fn template() -> Self {
        let mut binding = Element::new("binding");
        binding.attributes.push(("template".into(), "ToastGeneric".into()));
        let mut visual = Element::new("visual");
        visual.push(binding);

        let mut root = Element::new("toast");
        root.attributes.push(("activationType".into(), "protocol".into()));
        root.attributes.push(("launch".into(), DEFAULT_LAUNCH.into()));
        root.push(visual);
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn binding(&self) -> &Element {
        &self.root.children[VISUAL].children[BINDING]
    }

    pub fn actions(&self) -> Option<&Element> {
        self.root.child("actions")
    }

    pub fn audio(&self) -> Option<&Element> {
        self.root.child("audio")
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.root.write_xml(&mut out);
        out
    }

    fn binding_mut(&mut self) -> &mut Element {
        &mut self.root.children[VISUAL].children[BINDING]
    }

    /// Single `actions` container, created on first use
    fn actions_mut(&mut self) -> &mut Element {
        let index = match self.root.children.iter().position(|c| c.name == "actions") {
            Some(i) => i,
            None => {
                self.root.push(Element::new("actions"));
                self.root.children.len() - 1
            }
        };
        &mut self.root.children[index]
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

// ========== Audio Resolution ==========

/// How a descriptor's sound is delivered
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPlan {
    /// No audio directive; platform default
    Default,
    /// Platform plays a system sound from the document
    System(Attributes),
    /// Document is silent; sound and/or speech run out of band
    Silent {
        play: Option<String>,
        speak: Option<String>,
    },
}

pub fn is_system_sound(src: &str) -> bool {
    src.starts_with(SYSTEM_SOUND_PREFIX)
}

/// Decide the single audio directive for a descriptor
pub fn audio_plan(desc: &ToastDescriptor) -> AudioPlan {
    let src = desc
        .audio
        .as_ref()
        .and_then(|a| a.get("src"))
        .map(|s| s.to_string());
    let speak = desc.dialogue.clone().filter(|d| !d.is_empty());

    match (src, speak) {
        (None, None) => AudioPlan::Default,
        (Some(src), None) if is_system_sound(&src) => match &desc.audio {
            Some(attrs) => AudioPlan::System(attrs.clone()),
            None => AudioPlan::Default,
        },
        (Some(src), speak) if is_system_sound(&src) => {
            debug!(src = %src, "dialogue requested; system sound dropped");
            AudioPlan::Silent { play: None, speak }
        }
        (play, speak) => AudioPlan::Silent { play, speak },
    }
}

// ========== Builder ==========

/// Assemble the document for a normalized descriptor
pub fn build(desc: &ToastDescriptor) -> Result<Document, BuildError> {
    let mut doc = Document::template();

    if let Some(target) = &desc.launch_target {
        doc.root.set_attribute("launch", target)?;
    }
    if let Some(duration) = desc.duration {
        doc.root.set_attribute("duration", duration.as_str())?;
    }
    if let Some(scenario) = &desc.scenario {
        doc.root.set_attribute("scenario", scenario)?;
    }

    for text in [&desc.title, &desc.body].into_iter().flatten() {
        let mut attrs = text.clone();
        let content = attrs.remove("text").map(|t| t.to_string()).unwrap_or_default();
        let element = Element::new("text")
            .with_attributes(&attrs)?
            .with_text(content);
        doc.binding_mut().push(element);
    }

    for input in &desc.inputs {
        let element = Element::new("input").with_attributes(input)?;
        doc.actions_mut().push(element);
    }
    for group in &desc.selections {
        let mut element = Element::new("input").with_attributes(&group.input)?;
        for option in &group.options {
            element.push(Element::new("selection").with_attributes(option)?);
        }
        doc.actions_mut().push(element);
    }
    for button in &desc.buttons {
        let element = Element::new("action").with_attributes(button)?;
        doc.actions_mut().push(element);
    }

    for image in [&desc.icon, &desc.image].into_iter().flatten() {
        let element = Element::new("image").with_attributes(image)?;
        doc.binding_mut().push(element);
    }

    if let Some(progress) = &desc.progress {
        let mut element = Element::new("progress");
        for key in progress.keys() {
            element.set_attribute(key, &format!("{{{key}}}"))?;
        }
        doc.binding_mut().push(element);
    }

    match audio_plan(desc) {
        AudioPlan::Default => {}
        AudioPlan::System(attrs) => {
            doc.root.push(Element::new("audio").with_attributes(&attrs)?);
        }
        AudioPlan::Silent { .. } => {
            let mut element = Element::new("audio");
            element.set_attribute("silent", "true")?;
            doc.root.push(element);
        }
    }

    debug!(
        texts = doc.binding().children_named("text").count(),
        actions = doc.actions().map_or(0, |a| a.children().len()),
        progress = desc.progress.is_some(),
        "document built"
    );
    Ok(doc)
}
