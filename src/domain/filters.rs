// Page-level filter slots declared by `$name` placeholders in the page title
use super::error::DashboardError;
use super::template::placeholders;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OptionsState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSlot {
    pub name: String,
    pub value: Option<String>,
    pub options: Vec<String>,
    pub options_state: OptionsState,
    /// Value supplied by the embedding context rather than chosen by the user.
    pub pinned: bool,
}

impl FilterSlot {
    fn new(name: String) -> Self {
        Self {
            name,
            value: None,
            options: Vec::new(),
            options_state: OptionsState::NotLoaded,
            pinned: false,
        }
    }

    pub fn is_set(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Human label: underscores read as spaces.
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// One slot per distinct placeholder in the page title, shared by all widgets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    slots: Vec<FilterSlot>,
}

impl FilterSet {
    pub fn from_title(title: &str) -> Self {
        Self {
            slots: Self::parse(title).into_iter().map(FilterSlot::new).collect(),
        }
    }

    pub fn parse(title: &str) -> Vec<String> {
        placeholders(title)
    }

    pub fn slots(&self) -> &[FilterSlot] {
        &self.slots
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    pub fn slot(&self, name: &str) -> Option<&FilterSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut FilterSlot, DashboardError> {
        self.slots
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| DashboardError::UnknownFilter(name.to_string()))
    }

    /// The selected, non-empty value of a slot.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.slot(name)
            .and_then(|s| s.value.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// True iff every declared slot has a non-empty value.
    pub fn is_ready(&self) -> bool {
        self.slots.iter().all(FilterSlot::is_set)
    }

    pub fn missing(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| !s.is_set())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Sets or clears (`None` or empty) a slot. Returns whether the value changed.
    pub fn set(&mut self, name: &str, value: Option<String>) -> Result<bool, DashboardError> {
        let value = value.filter(|v| !v.is_empty());
        let slot = self.slot_mut(name)?;
        if slot.value == value {
            return Ok(false);
        }
        tracing::debug!("Filter {} = {:?}", name, value);
        slot.value = value;
        Ok(true)
    }

    /// Fixes a slot to a context-supplied value; it offers only that value and
    /// is never queried for options.
    pub fn pin(&mut self, name: &str, value: String) -> Result<(), DashboardError> {
        let slot = self.slot_mut(name)?;
        slot.options = vec![value.clone()];
        slot.value = Some(value);
        slot.options_state = OptionsState::Loaded;
        slot.pinned = true;
        Ok(())
    }

    /// Slots whose options have never been requested. Marks them as loading so
    /// each slot is fetched at most once.
    pub fn take_pending_option_loads(&mut self) -> Vec<String> {
        self.slots
            .iter_mut()
            .filter(|s| !s.pinned && s.options_state == OptionsState::NotLoaded)
            .map(|s| {
                s.options_state = OptionsState::Loading;
                s.name.clone()
            })
            .collect()
    }

    pub fn finish_option_load(&mut self, name: &str, result: Result<Vec<String>, String>) {
        let Ok(slot) = self.slot_mut(name) else {
            return;
        };
        match result {
            Ok(options) => {
                slot.options = options;
                slot.options_state = OptionsState::Loaded;
            }
            Err(e) => {
                tracing::warn!("Failed to load options for filter {}: {}", name, e);
                slot.options_state = OptionsState::Failed(e);
            }
        }
    }
}
