// Widget store - the single gate enforcing non-overlap on every mutation
use super::error::DashboardError;
use super::geometry::{Bounds, CellPos, GridSpec};
use super::widget::{Widget, WidgetPatch};

#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    grid: GridSpec,
    widgets: Vec<Widget>,
}

impl WidgetStore {
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            widgets: Vec::new(),
        }
    }

    /// Builds a store from a persisted widget list. Widgets that would break
    /// the grid invariants are dropped and logged.
    pub fn from_widgets(grid: GridSpec, widgets: Vec<Widget>) -> Self {
        let mut store = Self::new(grid);
        for widget in widgets {
            let id = widget.id.clone();
            if let Err(e) = store.add(widget) {
                tracing::warn!("Dropping stored widget {}: {}", id, e);
            }
        }
        store
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_at(&self, cell: CellPos) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.bounds.contains(cell))
    }

    /// First widget (other than `exclude`) whose bounds intersect `bounds`.
    pub fn find_overlap(&self, bounds: &Bounds, exclude: Option<&str>) -> Option<&Widget> {
        self.widgets
            .iter()
            .filter(|w| Some(w.id.as_str()) != exclude)
            .find(|w| w.bounds.overlaps(bounds))
    }

    /// Whether `bounds` fits the grid without touching any widget but `exclude`.
    pub fn is_free(&self, bounds: &Bounds, exclude: Option<&str>) -> bool {
        self.grid.contains(bounds) && self.find_overlap(bounds, exclude).is_none()
    }

    fn check_placement(&self, bounds: &Bounds, exclude: Option<&str>) -> Result<(), DashboardError> {
        self.grid.validate(bounds)?;
        match self.find_overlap(bounds, exclude) {
            Some(other) => Err(DashboardError::Overlap {
                bounds: *bounds,
                conflicting_id: other.id.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn add(&mut self, widget: Widget) -> Result<(), DashboardError> {
        if self.get(&widget.id).is_some() {
            return Err(DashboardError::InvalidWidget(format!(
                "duplicate widget id {}",
                widget.id
            )));
        }
        self.check_placement(&widget.bounds, None)?;
        tracing::debug!("Adding widget {} at {}", widget.id, widget.bounds);
        self.widgets.push(widget);
        Ok(())
    }

    pub fn update_bounds(&mut self, id: &str, bounds: Bounds) -> Result<(), DashboardError> {
        if self.get(id).is_none() {
            return Err(DashboardError::NotFound(id.to_string()));
        }
        self.check_placement(&bounds, Some(id))?;

        if let Some(widget) = self.widgets.iter_mut().find(|w| w.id == id) {
            tracing::debug!("Widget {} bounds {} -> {}", id, widget.bounds, bounds);
            widget.bounds = bounds;
        }
        Ok(())
    }

    pub fn update_content(&mut self, id: &str, patch: WidgetPatch) -> Result<&Widget, DashboardError> {
        let widget = self
            .widgets
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| DashboardError::NotFound(id.to_string()))?;
        widget.apply(patch);
        Ok(&*widget)
    }

    /// Idempotent: removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Widget> {
        let index = self.widgets.iter().position(|w| w.id == id)?;
        Some(self.widgets.remove(index))
    }
}
