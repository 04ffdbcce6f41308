//! Module extensions: pluggable per-module capabilities such as an SDK binding
//! or a language level.

use taproot_xml::Element;

pub(crate) const EXTENSION_ELEMENT: &str = "extension";
const ID_ATTR: &str = "id";
const ENABLED_ATTR: &str = "enabled";
const SDK_ELEMENT: &str = "sdk";
const SDK_NAME_ATTR: &str = "name";
const LANGUAGE_LEVEL_ATTR: &str = "language-level";

/// Shape of the state an extension provider contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Plain,
    WithSdk,
    LanguageLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProvider {
    id: String,
    kind: ExtensionKind,
}

impl ExtensionProvider {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }
}

/// The extension providers known to a project. Every root model holds one
/// extension per registered provider, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    providers: Vec<ExtensionProvider>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics when a provider with the same id is already registered.
    pub fn register(&mut self, id: impl Into<String>, kind: ExtensionKind) {
        let id = id.into();
        assert!(
            self.get(&id).is_none(),
            "extension provider `{id}` is already registered"
        );
        self.providers.push(ExtensionProvider { id, kind });
    }

    pub fn get(&self, id: &str) -> Option<&ExtensionProvider> {
        self.providers.iter().find(|provider| provider.id == id)
    }

    pub fn providers(&self) -> &[ExtensionProvider] {
        &self.providers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionState {
    Plain,
    WithSdk { sdk_name: Option<String> },
    LanguageLevel { level: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExtension {
    id: String,
    enabled: bool,
    state: ExtensionState,
}

impl ModuleExtension {
    /// The default, disabled instance for a provider.
    pub(crate) fn from_provider(provider: &ExtensionProvider) -> Self {
        let state = match provider.kind {
            ExtensionKind::Plain => ExtensionState::Plain,
            ExtensionKind::WithSdk => ExtensionState::WithSdk { sdk_name: None },
            ExtensionKind::LanguageLevel => ExtensionState::LanguageLevel { level: None },
        };
        Self {
            id: provider.id.clone(),
            enabled: false,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> &ExtensionState {
        &self.state
    }

    pub fn sdk_name(&self) -> Option<&str> {
        match &self.state {
            ExtensionState::WithSdk { sdk_name } => sdk_name.as_deref(),
            _ => None,
        }
    }

    pub fn carries_sdk(&self) -> bool {
        matches!(self.state, ExtensionState::WithSdk { .. })
    }

    pub fn language_level(&self) -> Option<&str> {
        match &self.state {
            ExtensionState::LanguageLevel { level } => level.as_deref(),
            _ => None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// # Panics
    ///
    /// Panics when the extension does not carry an SDK.
    pub fn set_sdk_name(&mut self, name: Option<String>) {
        match &mut self.state {
            ExtensionState::WithSdk { sdk_name } => *sdk_name = name,
            _ => panic!("extension `{}` does not carry an SDK", self.id),
        }
    }

    /// # Panics
    ///
    /// Panics when the extension does not carry a language level.
    pub fn set_language_level(&mut self, language_level: Option<String>) {
        match &mut self.state {
            ExtensionState::LanguageLevel { level } => *level = language_level,
            _ => panic!("extension `{}` does not carry a language level", self.id),
        }
    }

    /// Persisted state, or `None` while the extension is disabled.
    pub(crate) fn state_element(&self) -> Option<Element> {
        if !self.enabled {
            return None;
        }
        let mut element = Element::new(EXTENSION_ELEMENT)
            .with_attribute(ID_ATTR, self.id.as_str())
            .with_attribute(ENABLED_ATTR, "true");
        match &self.state {
            ExtensionState::Plain => {}
            ExtensionState::WithSdk { sdk_name } => {
                if let Some(name) = sdk_name {
                    element.add_child(
                        Element::new(SDK_ELEMENT).with_attribute(SDK_NAME_ATTR, name.as_str()),
                    );
                }
            }
            ExtensionState::LanguageLevel { level } => {
                if let Some(level) = level {
                    element.set_attribute(LANGUAGE_LEVEL_ATTR, level.as_str());
                }
            }
        }
        Some(element)
    }

    /// Loads this extension's state from the `extension` child of `component`
    /// carrying the same id. Without such a child the extension stays disabled.
    pub(crate) fn load_state(&mut self, component: &Element) {
        let Some(element) = component
            .children_named(EXTENSION_ELEMENT)
            .find(|child| child.attribute(ID_ATTR) == Some(self.id.as_str()))
        else {
            return;
        };

        self.enabled = element
            .attribute(ENABLED_ATTR)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
        match &mut self.state {
            ExtensionState::Plain => {}
            ExtensionState::WithSdk { sdk_name } => {
                *sdk_name = element
                    .child(SDK_ELEMENT)
                    .and_then(|sdk| sdk.attribute(SDK_NAME_ATTR))
                    .filter(|name| !name.trim().is_empty())
                    .map(str::to_owned);
            }
            ExtensionState::LanguageLevel { level } => {
                *level = element
                    .attribute(LANGUAGE_LEVEL_ATTR)
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_owned);
            }
        }
    }
}
