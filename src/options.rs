//! Caller options: shorthand shapes and their normalization
//!
//! Every option family accepts a bare scalar or a (partial) mapping; selections
//! additionally accept lists. Normalization expands each shape into a complete
//! attribute mapping using a fixed per-field default table. Keys the table does
//! not know pass through untouched so renderer attributes (`hint-maxLines`,
//! `placement`, `hint-buttonStyle`, ...) can be forwarded as-is.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::InputShapeError;
use crate::progress::Progress;

/// Attribute value as given by the caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Complete (or partial, before normalization) attribute mapping
pub type Attributes = BTreeMap<String, Scalar>;

/// Build an attribute mapping from literal pairs
pub fn attrs<const N: usize>(pairs: [(&str, Scalar); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Scalar-or-mapping shape shared by every single-valued option family
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Shorthand {
    Scalar(Scalar),
    Mapping(Attributes),
}

impl Shorthand {
    /// Empty text scalar
    pub fn is_blank(&self) -> bool {
        matches!(self, Shorthand::Scalar(Scalar::Text(t)) if t.is_empty())
    }
}

impl From<&str> for Shorthand {
    fn from(s: &str) -> Self {
        Shorthand::Scalar(s.into())
    }
}

impl From<String> for Shorthand {
    fn from(s: String) -> Self {
        Shorthand::Scalar(s.into())
    }
}

impl From<Attributes> for Shorthand {
    fn from(m: Attributes) -> Self {
        Shorthand::Mapping(m)
    }
}

/// Explicit selection group: `{input: {id, type}, options: [...]}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionGroupOption {
    #[serde(default)]
    pub input: Option<Attributes>,
    pub options: Vec<Shorthand>,
}

/// One selection group: explicit mapping or a bare list of choices
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectionOption {
    Group(SelectionGroupOption),
    Choices(Vec<Shorthand>),
}

/// `selections` value: several groups, or a flat list forming a single group
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectionsOption {
    Groups(Vec<SelectionOption>),
    Choices(Vec<Shorthand>),
}

/// Normalized selection group
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionGroup {
    pub input: Attributes,
    pub options: Vec<Attributes>,
}

impl From<SelectionGroup> for SelectionOption {
    fn from(g: SelectionGroup) -> Self {
        SelectionOption::Group(SelectionGroupOption {
            input: Some(g.input),
            options: g.options.into_iter().map(Shorthand::Mapping).collect(),
        })
    }
}

/// Root `duration` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastDuration {
    Short,
    Long,
}

impl ToastDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastDuration::Short => "short",
            ToastDuration::Long => "long",
        }
    }
}

// ========== Field Table ==========

/// Option families with a scalar-or-mapping shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Icon,
    Image,
    Audio,
    Input,
    Button,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Text => "text",
            Field::Icon => "icon",
            Field::Image => "image",
            Field::Audio => "audio",
            Field::Input => "input",
            Field::Button => "button",
        }
    }

    /// Key the scalar shorthand lands in; must be present after normalization
    pub fn primary_key(self) -> &'static str {
        match self {
            Field::Text => "text",
            Field::Icon | Field::Image | Field::Audio => "src",
            Field::Input => "id",
            Field::Button => "content",
        }
    }

    /// Expand a bare scalar into its complete mapping
    fn expand(self, value: &Scalar) -> Attributes {
        let mut map = Attributes::new();
        map.insert(self.primary_key().to_string(), value.clone());
        if self == Field::Input {
            map.insert("placeholder".to_string(), value.clone());
        }
        self.fill_defaults(&mut map);
        map
    }

    /// Populate keys the default table requires, keeping caller values
    fn fill_defaults(self, map: &mut Attributes) {
        match self {
            Field::Icon => {
                map.entry("placement".into())
                    .or_insert_with(|| "appLogoOverride".into());
                map.entry("hint-crop".into())
                    .or_insert_with(|| "circle".into());
            }
            Field::Input => {
                map.entry("type".into()).or_insert_with(|| "text".into());
            }
            Field::Button => {
                let content = map.get("content").map(|c| c.to_string()).unwrap_or_default();
                map.entry("activationType".into())
                    .or_insert_with(|| "protocol".into());
                map.entry("arguments".into())
                    .or_insert_with(|| format!("http:{content}").into());
            }
            Field::Text | Field::Image | Field::Audio => {}
        }
    }
}

/// Normalize one scalar-or-mapping option into its complete mapping
pub fn normalize(field: Field, value: &Shorthand) -> Result<Attributes, InputShapeError> {
    let map = match value {
        Shorthand::Scalar(s) => field.expand(s),
        Shorthand::Mapping(m) => {
            let mut map = m.clone();
            require(&map, field.name(), field.primary_key())?;
            field.fill_defaults(&mut map);
            map
        }
    };
    require(&map, field.name(), field.primary_key())?;
    Ok(map)
}

/// Normalize one selection group
pub fn normalize_selection(value: &SelectionOption) -> Result<SelectionGroup, InputShapeError> {
    let (input, choices) = match value {
        SelectionOption::Group(g) => (g.input.clone().unwrap_or_default(), &g.options),
        SelectionOption::Choices(c) => (Attributes::new(), c),
    };

    let mut input = input;
    input
        .entry("id".into())
        .or_insert_with(|| "selection".into());
    input
        .entry("type".into())
        .or_insert_with(|| "selection".into());

    let options = choices
        .iter()
        .map(normalize_choice)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SelectionGroup { input, options })
}

fn normalize_choice(value: &Shorthand) -> Result<Attributes, InputShapeError> {
    let mut map = match value {
        Shorthand::Scalar(s) => attrs([("id", s.clone()), ("content", s.clone())]),
        Shorthand::Mapping(m) => m.clone(),
    };
    match (map.get("id").cloned(), map.get("content").cloned()) {
        (Some(_), Some(_)) => {}
        (Some(id), None) => {
            map.insert("content".into(), id);
        }
        (None, Some(content)) => {
            map.insert("id".into(), content);
        }
        (None, None) => {
            return Err(InputShapeError::MissingKey {
                field: "selection",
                key: "id",
            });
        }
    }
    require(&map, "selection", "id")?;
    Ok(map)
}

fn require(map: &Attributes, field: &'static str, key: &'static str) -> Result<(), InputShapeError> {
    match map.get(key) {
        None => Err(InputShapeError::MissingKey { field, key }),
        Some(v) if v.to_string().is_empty() => Err(InputShapeError::Empty { field, key }),
        Some(_) => Ok(()),
    }
}

// ========== Options / Descriptor ==========

/// Loosely-typed caller request; every key optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToastOptions {
    pub title: Option<Shorthand>,
    pub body: Option<Shorthand>,
    pub icon: Option<Shorthand>,
    pub image: Option<Shorthand>,
    pub audio: Option<Shorthand>,
    pub dialogue: Option<String>,
    pub progress: Option<Progress>,
    pub inputs: Vec<Shorthand>,
    pub selections: Option<SelectionsOption>,
    pub buttons: Vec<Shorthand>,
    #[serde(alias = "launch")]
    pub launch_target: Option<String>,
    pub duration: Option<ToastDuration>,
    pub scenario: Option<String>,
    #[serde(alias = "appId")]
    pub app_identity: Option<String>,
}

impl ToastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON descriptor
    pub fn from_json(json: &str) -> Result<Self, InputShapeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn title(mut self, title: impl Into<Shorthand>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<Shorthand>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<Shorthand>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn image(mut self, image: impl Into<Shorthand>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn audio(mut self, audio: impl Into<Shorthand>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn dialogue(mut self, text: impl Into<String>) -> Self {
        self.dialogue = Some(text.into());
        self
    }

    pub fn progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn input(mut self, input: impl Into<Shorthand>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn selections(mut self, selections: SelectionsOption) -> Self {
        self.selections = Some(selections);
        self
    }

    pub fn button(mut self, button: impl Into<Shorthand>) -> Self {
        self.buttons.push(button.into());
        self
    }

    pub fn launch(mut self, target: impl Into<String>) -> Self {
        self.launch_target = Some(target.into());
        self
    }

    pub fn app_identity(mut self, id: impl Into<String>) -> Self {
        self.app_identity = Some(id.into());
        self
    }

    /// Expand every option into its canonical form
    pub fn normalize(&self) -> Result<ToastDescriptor, InputShapeError> {
        // An empty scalar omits that aspect, like an absent key
        let one = |field: Field, v: &Option<Shorthand>| {
            v.as_ref()
                .filter(|v| !v.is_blank())
                .map(|v| normalize(field, v))
                .transpose()
        };
        let many = |field: Field, v: &[Shorthand]| {
            v.iter()
                .filter(|v| !v.is_blank())
                .map(|v| normalize(field, v))
                .collect::<Result<Vec<_>, _>>()
        };

        let selections = match &self.selections {
            None => Vec::new(),
            Some(SelectionsOption::Choices(c)) => {
                vec![normalize_selection(&SelectionOption::Choices(c.clone()))?]
            }
            Some(SelectionsOption::Groups(groups)) => groups
                .iter()
                .map(normalize_selection)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(ToastDescriptor {
            title: one(Field::Text, &self.title)?,
            body: one(Field::Text, &self.body)?,
            icon: one(Field::Icon, &self.icon)?,
            image: one(Field::Image, &self.image)?,
            audio: one(Field::Audio, &self.audio)?,
            dialogue: self.dialogue.clone(),
            progress: self.progress.clone(),
            inputs: many(Field::Input, self.inputs.as_slice())?,
            selections,
            buttons: many(Field::Button, self.buttons.as_slice())?,
            launch_target: self.launch_target.clone(),
            duration: self.duration,
            scenario: self.scenario.clone(),
            app_identity: self.app_identity.clone(),
        })
    }
}

/// Fully normalized request consumed by the document builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToastDescriptor {
    pub title: Option<Attributes>,
    pub body: Option<Attributes>,
    pub icon: Option<Attributes>,
    pub image: Option<Attributes>,
    pub audio: Option<Attributes>,
    pub dialogue: Option<String>,
    pub progress: Option<Progress>,
    pub inputs: Vec<Attributes>,
    pub selections: Vec<SelectionGroup>,
    pub buttons: Vec<Attributes>,
    pub launch_target: Option<String>,
    pub duration: Option<ToastDuration>,
    pub scenario: Option<String>,
    pub app_identity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Shorthand Expansion Tests ==========

    #[test]
    fn test_text_scalar() {
        let map = normalize(Field::Text, &"Hi".into()).unwrap();
        assert_eq!(map, attrs([("text", "Hi".into())]));
    }

    #[test]
    fn test_icon_scalar_defaults() {
        let map = normalize(Field::Icon, &"logo.png".into()).unwrap();
        assert_eq!(
            map,
            attrs([
                ("placement", "appLogoOverride".into()),
                ("hint-crop", "circle".into()),
                ("src", "logo.png".into()),
            ])
        );
    }

    #[test]
    fn test_icon_mapping_keeps_caller_placement() {
        let value = Shorthand::Mapping(attrs([
            ("src", "logo.png".into()),
            ("hint-crop", "none".into()),
        ]));
        let map = normalize(Field::Icon, &value).unwrap();
        assert_eq!(map["hint-crop"], Scalar::from("none"));
        assert_eq!(map["placement"], Scalar::from("appLogoOverride"));
    }

    #[test]
    fn test_input_scalar() {
        let map = normalize(Field::Input, &"reply".into()).unwrap();
        assert_eq!(
            map,
            attrs([
                ("id", "reply".into()),
                ("type", "text".into()),
                ("placeholder", "reply".into()),
            ])
        );
    }

    #[test]
    fn test_button_scalar() {
        let map = normalize(Field::Button, &"Play".into()).unwrap();
        assert_eq!(
            map,
            attrs([
                ("activationType", "protocol".into()),
                ("arguments", "http:Play".into()),
                ("content", "Play".into()),
            ])
        );
    }

    #[test]
    fn test_button_mapping_extra_keys_pass_through() {
        let value = Shorthand::Mapping(attrs([
            ("content", "Open".into()),
            ("arguments", "https://example.com".into()),
            ("hint-buttonStyle", "Success".into()),
        ]));
        let map = normalize(Field::Button, &value).unwrap();
        assert_eq!(map["arguments"], Scalar::from("https://example.com"));
        assert_eq!(map["hint-buttonStyle"], Scalar::from("Success"));
        assert_eq!(map["activationType"], Scalar::from("protocol"));
    }

    #[test]
    fn test_mapping_missing_primary_key() {
        let value = Shorthand::Mapping(attrs([("placement", "hero".into())]));
        assert_eq!(
            normalize(Field::Image, &value),
            Err(InputShapeError::MissingKey {
                field: "image",
                key: "src"
            })
        );
    }

    #[test]
    fn test_empty_scalar_rejected() {
        assert_eq!(
            normalize(Field::Button, &"".into()),
            Err(InputShapeError::Empty {
                field: "button",
                key: "content"
            })
        );
    }

    #[test]
    fn test_empty_scalar_option_omitted() {
        let desc = ToastOptions::new()
            .title("Hi")
            .body("")
            .icon("")
            .button("")
            .button("Play")
            .normalize()
            .unwrap();
        assert_eq!(desc.title.unwrap()["text"], Scalar::Text("Hi".into()));
        assert_eq!(desc.body, None);
        assert_eq!(desc.icon, None);
        assert_eq!(desc.buttons.len(), 1);
        assert_eq!(desc.buttons[0]["content"], Scalar::Text("Play".into()));
    }

    #[test]
    fn test_empty_mapping_value_still_rejected() {
        let err = ToastOptions::new()
            .body(attrs([("text", "".into())]))
            .normalize()
            .unwrap_err();
        assert_eq!(
            err,
            InputShapeError::Empty {
                field: "text",
                key: "text"
            }
        );
    }

    #[test]
    fn test_numeric_scalar_text() {
        let map = normalize(Field::Text, &Shorthand::Scalar(Scalar::Int(42))).unwrap();
        assert_eq!(map["text"].to_string(), "42");
    }

    // ========== Idempotence Tests ==========

    #[test]
    fn test_normalize_idempotent_all_fields() {
        for field in [
            Field::Text,
            Field::Icon,
            Field::Image,
            Field::Audio,
            Field::Input,
            Field::Button,
        ] {
            let once = normalize(field, &"value".into()).unwrap();
            let twice = normalize(field, &Shorthand::Mapping(once.clone())).unwrap();
            assert_eq!(once, twice, "{}", field.name());
        }
    }

    #[test]
    fn test_selection_idempotent() {
        let once = normalize_selection(&SelectionOption::Choices(vec![
            "Apple".into(),
            "Banana".into(),
        ]))
        .unwrap();
        let twice = normalize_selection(&once.clone().into()).unwrap();
        assert_eq!(once, twice);
    }

    // ========== Selection Tests ==========

    #[test]
    fn test_selection_list_shorthand() {
        let group = normalize_selection(&SelectionOption::Choices(vec![
            "Apple".into(),
            "Banana".into(),
        ]))
        .unwrap();
        assert_eq!(
            group.input,
            attrs([("id", "selection".into()), ("type", "selection".into())])
        );
        assert_eq!(
            group.options,
            vec![
                attrs([("id", "Apple".into()), ("content", "Apple".into())]),
                attrs([("id", "Banana".into()), ("content", "Banana".into())]),
            ]
        );
    }

    #[test]
    fn test_selection_choice_mapping_fills_counterpart() {
        let group = normalize_selection(&SelectionOption::Choices(vec![Shorthand::Mapping(
            attrs([("id", "a".into())]),
        )]))
        .unwrap();
        assert_eq!(group.options[0]["content"], Scalar::from("a"));
    }

    #[test]
    fn test_selection_choice_without_id_or_content() {
        let err = normalize_selection(&SelectionOption::Choices(vec![Shorthand::Mapping(
            attrs([("hint", "x".into())]),
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            InputShapeError::MissingKey {
                field: "selection",
                key: "id"
            }
        );
    }

    // ========== JSON Tests ==========

    #[test]
    fn test_from_json_shapes() {
        let opts = ToastOptions::from_json(
            r#"{
                "title": "Hi",
                "body": {"text": "there", "hint-maxLines": 2},
                "buttons": ["Play", {"content": "Stop", "activationType": "system"}],
                "selections": ["Apple", "Banana"],
                "progress": {"value": 0.5, "status": "Copying"},
                "launch": "https://example.com",
                "duration": "long",
                "appId": "Demo"
            }"#,
        )
        .unwrap();
        assert_eq!(opts.title, Some("Hi".into()));
        assert_eq!(opts.buttons.len(), 2);
        assert_eq!(opts.launch_target.as_deref(), Some("https://example.com"));
        assert_eq!(opts.duration, Some(ToastDuration::Long));
        assert_eq!(opts.app_identity.as_deref(), Some("Demo"));
        assert!(matches!(opts.selections, Some(SelectionsOption::Choices(_))));

        let desc = opts.normalize().unwrap();
        assert_eq!(desc.body.unwrap()["hint-maxLines"], Scalar::Int(2));
        assert_eq!(desc.buttons[1]["arguments"], Scalar::from("http:Stop"));
        assert_eq!(desc.selections.len(), 1);
    }

    #[test]
    fn test_from_json_selection_groups() {
        let opts = ToastOptions::from_json(
            r#"{"selections": [
                {"input": {"id": "fruit"}, "options": ["Apple"]},
                ["Red", "Green"]
            ]}"#,
        )
        .unwrap();
        let desc = opts.normalize().unwrap();
        assert_eq!(desc.selections.len(), 2);
        assert_eq!(desc.selections[0].input["id"], Scalar::from("fruit"));
        assert_eq!(desc.selections[0].input["type"], Scalar::from("selection"));
        assert_eq!(desc.selections[1].options.len(), 2);
    }

    #[test]
    fn test_from_json_unrecognized_shape() {
        let err = ToastOptions::from_json(r#"{"title": ["a", "b"]}"#).unwrap_err();
        assert!(matches!(err, InputShapeError::Parse(_)));
    }

    #[test]
    fn test_builder_methods() {
        let desc = ToastOptions::new()
            .title("Hi")
            .body("there")
            .input("reply")
            .button("Play")
            .normalize()
            .unwrap();
        assert_eq!(desc.title, Some(attrs([("text", "Hi".into())])));
        assert_eq!(desc.inputs.len(), 1);
        assert_eq!(desc.buttons.len(), 1);
        assert!(desc.progress.is_none());
    }
}
