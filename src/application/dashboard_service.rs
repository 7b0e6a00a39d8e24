// Dashboard service - Opens pages and drives one page's editing session
use crate::application::gateways::{ColumnOptionsProvider, GridConfigRepository, GridDocument, QueryExecutor};
use crate::application::query_scheduler::{QueryContext, QueryScheduler, RunOutcome};
use crate::domain::chart::ChartData;
use crate::domain::error::DashboardError;
use crate::domain::filters::FilterSet;
use crate::domain::geometry::{CellPos, GridRect, GridSpec};
use crate::domain::runtime::WidgetRuntimeState;
use crate::domain::selection::{CellClick, DragMode, DragOutcome, GridKey, KeyOutcome, Preview, SelectionController};
use crate::domain::store::WidgetStore;
use crate::domain::widget::{Widget, WidgetDraft, WidgetId, WidgetPatch};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn GridConfigRepository>,
    executor: Arc<dyn QueryExecutor>,
    options: Arc<dyn ColumnOptionsProvider>,
    grid: GridSpec,
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn GridConfigRepository>,
        executor: Arc<dyn QueryExecutor>,
        options: Arc<dyn ColumnOptionsProvider>,
        grid: GridSpec,
    ) -> Self {
        Self {
            repository,
            executor,
            options,
            grid,
        }
    }

    /// Loads the page's widgets, declares its filters, applies preset values,
    /// loads filter options and runs every widget whose filters are complete.
    pub async fn open_page(
        &self,
        page_name: &str,
        presets: &HashMap<String, String>,
    ) -> Result<DashboardPage, DashboardError> {
        let document = self
            .repository
            .load_grid_config(page_name)
            .await
            .map_err(|e| DashboardError::Persistence(format!("{e:#}")))?;
        let widgets = document.map(|d| d.widgets).unwrap_or_default();
        let store = WidgetStore::from_widgets(self.grid, widgets);

        let mut filters = FilterSet::from_title(page_name);
        for (name, value) in presets {
            if filters.slot(name).is_some() {
                filters.pin(name, value.clone())?;
            } else {
                tracing::debug!("Preset {} is not a filter of page {}", name, page_name);
            }
        }

        tracing::info!(
            "Opened page {} with {} widgets and {} filters",
            page_name,
            store.len(),
            filters.slots().len()
        );

        let mut page = DashboardPage {
            name: page_name.to_string(),
            store,
            selection: SelectionController::new(),
            filters,
            scheduler: QueryScheduler::new(self.executor.clone()),
            repository: self.repository.clone(),
            options: self.options.clone(),
            save_error: None,
        };
        page.load_filter_options().await;
        page.refresh_all().await;
        Ok(page)
    }
}

/// One open page: its widgets, filters, interaction state and query results.
pub struct DashboardPage {
    name: String,
    store: WidgetStore,
    selection: SelectionController,
    filters: FilterSet,
    scheduler: QueryScheduler,
    repository: Arc<dyn GridConfigRepository>,
    options: Arc<dyn ColumnOptionsProvider>,
    save_error: Option<DashboardError>,
}

impl DashboardPage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &WidgetStore {
        &self.store
    }

    pub fn widgets(&self) -> &[Widget] {
        self.store.widgets()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn scheduler(&self) -> &QueryScheduler {
        &self.scheduler
    }

    /// Error of the last save, if it failed.
    pub fn save_error(&self) -> Option<&DashboardError> {
        self.save_error.as_ref()
    }

    pub async fn runtime_state(&self, widget_id: &str) -> Option<WidgetRuntimeState> {
        self.scheduler.state(widget_id).await
    }

    pub async fn chart_data(&self, widget_id: &str) -> Option<ChartData> {
        let widget = self.store.get(widget_id)?;
        self.scheduler.chart_data(widget).await
    }

    fn context(&self) -> QueryContext<'_> {
        QueryContext::new(&self.name, &self.filters)
    }

    async fn load_filter_options(&mut self) {
        let pending = self.filters.take_pending_option_loads();
        if pending.is_empty() {
            return;
        }
        let options = &self.options;
        let loads = pending.iter().map(|name| async move {
            options
                .get_distinct_values(name)
                .await
                .map_err(|e| format!("{e:#}"))
        });
        let results = join_all(loads).await;
        for (name, result) in pending.iter().zip(results) {
            self.filters.finish_option_load(name, result);
        }
    }

    /// Sets or clears a filter and re-runs the page once every filter has a value.
    pub async fn set_filter(
        &mut self,
        name: &str,
        value: Option<String>,
    ) -> Result<Vec<(WidgetId, RunOutcome)>, DashboardError> {
        if !self.filters.set(name, value)? {
            return Ok(Vec::new());
        }
        if !self.filters.is_ready() {
            tracing::debug!(
                "Page {} paused until filters are set: {}",
                self.name,
                self.filters.missing().join(", ")
            );
            return Ok(Vec::new());
        }
        Ok(self.refresh_all().await)
    }

    pub async fn refresh_all(&self) -> Vec<(WidgetId, RunOutcome)> {
        self.scheduler
            .refresh_all(self.store.widgets(), &self.context())
            .await
    }

    pub async fn refresh_widget(&self, widget_id: &str) -> Result<RunOutcome, DashboardError> {
        let widget = self
            .store
            .get(widget_id)
            .ok_or_else(|| DashboardError::NotFound(widget_id.to_string()))?;
        Ok(self.scheduler.refresh_widget(widget, &self.context()).await)
    }

    pub async fn load_more(&self, widget_id: &str) -> Result<RunOutcome, DashboardError> {
        let widget = self
            .store
            .get(widget_id)
            .ok_or_else(|| DashboardError::NotFound(widget_id.to_string()))?;
        Ok(self.scheduler.load_more(widget, &self.context()).await)
    }

    // Grid interaction

    pub fn click_cell(&mut self, cell: CellPos) -> CellClick {
        let click = self.selection.click_cell(cell, &self.store);
        if let CellClick::OnWidget(widget_id) = &click {
            self.selection.click_widget(widget_id);
        }
        click
    }

    pub fn hover_cell(&mut self, cell: CellPos) -> Option<Preview> {
        self.selection.hover_cell(cell, &self.store)
    }

    pub fn click_widget(&mut self, widget_id: &str) -> Option<WidgetId> {
        self.selection.click_widget(widget_id).map(str::to_string)
    }

    pub fn cancel_selection(&mut self) {
        self.selection.cancel();
    }

    /// Leaves edit mode, dropping the selection and any drag in progress.
    pub fn exit_edit_mode(&mut self) {
        self.selection.reset();
    }

    /// Creates a widget on the pending region, saves the page and runs it.
    pub async fn confirm_widget(&mut self, draft: WidgetDraft) -> Result<WidgetId, DashboardError> {
        let widget_id = self.selection.confirm(draft, &mut self.store)?;
        tracing::info!("Created widget {} on {}", widget_id, self.name);
        self.persist().await;
        self.refresh_widget(&widget_id).await?;
        Ok(widget_id)
    }

    pub fn press_handle(
        &mut self,
        widget_id: &str,
        mode: DragMode,
        pointer: (f64, f64),
        rect: GridRect,
    ) -> Result<Preview, DashboardError> {
        self.selection
            .press_handle(widget_id, mode, pointer, rect, &self.store)
    }

    pub fn pointer_move(&mut self, pointer: (f64, f64)) -> Option<Preview> {
        self.selection.pointer_move(pointer, &self.store)
    }

    pub async fn release(&mut self) -> Option<DragOutcome> {
        let outcome = self.selection.release(&mut self.store)?;
        if matches!(outcome, DragOutcome::Committed { .. }) {
            self.persist().await;
        }
        Some(outcome)
    }

    pub async fn key_press(&mut self, key: GridKey) -> KeyOutcome {
        let outcome = self.selection.key_press(key, &mut self.store);
        match &outcome {
            KeyOutcome::Moved { .. } => self.persist().await,
            KeyOutcome::Removed(widget) => {
                self.scheduler.remove(&widget.id).await;
                self.persist().await;
            }
            KeyOutcome::NoOp => {}
        }
        outcome
    }

    /// Applies an edit-form submission. A changed kind drops the cached
    /// results; a changed kind or query re-runs the widget.
    pub async fn update_content(&mut self, widget_id: &str, patch: WidgetPatch) -> Result<(), DashboardError> {
        let before = self
            .store
            .get(widget_id)
            .map(|w| (w.kind, w.query.clone()))
            .ok_or_else(|| DashboardError::NotFound(widget_id.to_string()))?;
        let (kind, query) = {
            let widget = self.store.update_content(widget_id, patch)?;
            (widget.kind, widget.query.clone())
        };
        self.persist().await;

        let kind_changed = before.0 != kind;
        if kind_changed {
            self.scheduler.reset(widget_id).await;
        }
        if kind_changed || before.1 != query {
            self.refresh_widget(widget_id).await?;
        }
        Ok(())
    }

    /// Idempotent: removing an unknown widget changes nothing and saves nothing.
    pub async fn remove_widget(&mut self, widget_id: &str) -> Option<Widget> {
        let removed = self.store.remove(widget_id)?;
        if self.selection.selected() == Some(widget_id) {
            self.selection.reset();
        }
        self.scheduler.remove(widget_id).await;
        tracing::info!("Removed widget {} from {}", widget_id, self.name);
        self.persist().await;
        Some(removed)
    }

    /// Re-sends the full widget list after a failed save.
    pub async fn retry_save(&mut self) -> Result<(), DashboardError> {
        self.persist().await;
        match &self.save_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn persist(&mut self) {
        let document = GridDocument::new(self.store.widgets().to_vec());
        match self.repository.save_grid_config(&self.name, &document).await {
            Ok(()) => {
                tracing::info!("Saved {} widgets for page {}", document.widgets.len(), self.name);
                self.save_error = None;
            }
            Err(e) => {
                tracing::warn!("Failed to save page {}: {:#}", self.name, e);
                self.save_error = Some(DashboardError::Persistence(format!("{e:#}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{rows, FakeExecutor, FakeOptions, FakeRepository};
    use crate::domain::geometry::Bounds;
    use crate::domain::selection::ResizeHandle;
    use crate::domain::widget::{ChartKind, Pagination, WidgetKind};

    struct Fixture {
        repository: Arc<FakeRepository>,
        executor: Arc<FakeExecutor>,
        options: Arc<FakeOptions>,
    }

    impl Fixture {
        fn new(repository: Arc<FakeRepository>) -> Self {
            Self {
                repository,
                executor: FakeExecutor::new(),
                options: FakeOptions::new(),
            }
        }

        fn service(&self) -> DashboardService {
            DashboardService::new(
                self.repository.clone(),
                self.executor.clone(),
                self.options.clone(),
                GridSpec::default(),
            )
        }

        async fn open(&self, page_name: &str) -> DashboardPage {
            self.service()
                .open_page(page_name, &HashMap::new())
                .await
                .unwrap()
        }
    }

    fn stored(id: &str, bounds: Bounds, kind: WidgetKind, query: &str) -> Widget {
        let mut w = Widget::new(
            bounds,
            WidgetDraft {
                kind,
                query: Some(query.to_string()),
                ..Default::default()
            },
        );
        w.id = id.to_string();
        w
    }

    fn select_region(page: &mut DashboardPage, from: (u32, u32), to: (u32, u32)) -> CellClick {
        page.click_cell(CellPos::new(from.0, from.1));
        page.click_cell(CellPos::new(to.0, to.1))
    }

    #[tokio::test]
    async fn test_create_rejects_overlapping_region() {
        let fixture = Fixture::new(FakeRepository::new());
        let mut page = fixture.open("Overview").await;

        assert_eq!(
            select_region(&mut page, (0, 0), (2, 2)),
            CellClick::Confirming(Bounds::new(0, 0, 2, 2))
        );
        page.confirm_widget(WidgetDraft::default()).await.unwrap();

        assert_eq!(
            select_region(&mut page, (1, 3), (3, 1)),
            CellClick::Rejected(Bounds::new(1, 1, 3, 3))
        );
        page.cancel_selection();

        assert_eq!(
            select_region(&mut page, (3, 0), (5, 2)),
            CellClick::Confirming(Bounds::new(3, 0, 5, 2))
        );
        page.confirm_widget(WidgetDraft::default()).await.unwrap();

        assert_eq!(page.widgets().len(), 2);
        assert_eq!(fixture.repository.save_count(), 2);
        assert_eq!(fixture.repository.document("Overview").unwrap().widgets.len(), 2);
    }

    #[tokio::test]
    async fn test_open_pins_presets_and_loads_other_options() {
        let fixture = Fixture::new(FakeRepository::new());
        fixture.options.set("brand", Ok(vec!["Nike", "Puma"]));
        fixture.options.set("region", Err("column not found"));

        let presets = HashMap::from([("store_no".to_string(), "S042".to_string())]);
        let page = fixture
            .service()
            .open_page("$brand $region $store_no forecast", &presets)
            .await
            .unwrap();

        let mut calls = fixture.options.calls();
        calls.sort();
        assert_eq!(calls, vec!["brand".to_string(), "region".to_string()]);
        assert_eq!(page.filters().slot("brand").unwrap().options, vec!["Nike", "Puma"]);
        assert!(page.filters().slot("region").unwrap().options.is_empty());
        assert_eq!(page.filters().value("store_no"), Some("S042"));
    }

    #[tokio::test]
    async fn test_clearing_filter_stops_execution() {
        let document = GridDocument::new(vec![stored(
            "sales",
            Bounds::new(0, 0, 3, 5),
            WidgetKind::Chart(ChartKind::Bar),
            "SELECT week, units FROM forecast WHERE brand = $brand",
        )]);
        let fixture = Fixture::new(FakeRepository::with_document("$brand sales", document));
        fixture.executor.respond("'Nike'", rows(4));
        let mut page = fixture.open("$brand sales").await;
        assert!(fixture.executor.calls().is_empty());

        let outcomes = page.set_filter("brand", Some("Nike".to_string())).await.unwrap();
        assert_eq!(outcomes, vec![("sales".to_string(), RunOutcome::Applied)]);
        assert_eq!(
            fixture.executor.calls(),
            vec!["SELECT week, units FROM forecast WHERE brand = 'Nike'".to_string()]
        );

        let outcomes = page.set_filter("brand", None).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(page.refresh_widget("sales").await, Ok(RunOutcome::Skipped));
        assert_eq!(fixture.executor.calls().len(), 1);

        page.set_filter("brand", Some("Nike".to_string())).await.unwrap();
        assert_eq!(fixture.executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_resize_into_neighbor_reverts() {
        let document = GridDocument::new(vec![
            stored("a", Bounds::new(0, 0, 2, 2), WidgetKind::Card, ""),
            stored("b", Bounds::new(3, 4, 5, 6), WidgetKind::Card, ""),
        ]);
        let fixture = Fixture::new(FakeRepository::with_document("Overview", document));
        let mut page = fixture.open("Overview").await;
        let rect = GridRect::new(0.0, 0.0, 800.0);

        page.press_handle("a", DragMode::Resize(ResizeHandle::SouthEast), (100.0, 50.0), rect)
            .unwrap();
        let preview = page.pointer_move((250.0, 100.0)).unwrap();
        assert_eq!(preview.bounds, Bounds::new(0, 0, 4, 5));
        assert!(!preview.valid);

        assert_eq!(
            page.release().await,
            Some(DragOutcome::Reverted {
                widget_id: "a".to_string(),
                bounds: Bounds::new(0, 0, 2, 2)
            })
        );
        assert_eq!(page.store().get("a").unwrap().bounds, Bounds::new(0, 0, 2, 2));
        assert_eq!(fixture.repository.save_count(), 0);
    }

    #[tokio::test]
    async fn test_committed_move_and_keys_persist() {
        let document = GridDocument::new(vec![stored("a", Bounds::new(0, 0, 1, 1), WidgetKind::Card, "")]);
        let fixture = Fixture::new(FakeRepository::with_document("Overview", document));
        let mut page = fixture.open("Overview").await;
        let rect = GridRect::new(0.0, 0.0, 800.0);

        page.press_handle("a", DragMode::Move, (0.0, 0.0), rect).unwrap();
        page.pointer_move((100.0, 50.0));
        assert!(matches!(page.release().await, Some(DragOutcome::Committed { .. })));
        assert_eq!(page.store().get("a").unwrap().bounds, Bounds::new(2, 2, 3, 3));

        assert!(matches!(page.key_press(GridKey::ArrowUp).await, KeyOutcome::Moved { .. }));
        assert_eq!(page.store().get("a").unwrap().bounds, Bounds::new(1, 2, 2, 3));

        assert!(matches!(page.key_press(GridKey::Delete).await, KeyOutcome::Removed(_)));
        assert!(page.widgets().is_empty());
        assert_eq!(fixture.repository.save_count(), 3);
        assert!(fixture.repository.document("Overview").unwrap().widgets.is_empty());
    }

    #[tokio::test]
    async fn test_table_load_more_through_page() {
        let document = GridDocument::new(vec![stored(
            "t",
            Bounds::new(0, 0, 9, 15),
            WidgetKind::Table(Pagination::new(50, true).unwrap()),
            "SELECT * FROM forecast",
        )]);
        let fixture = Fixture::new(FakeRepository::with_document("Forecast", document));
        fixture.executor.respond("OFFSET 0", rows(50));
        fixture.executor.respond("OFFSET 50", rows(30));
        let page = fixture.open("Forecast").await;

        let state = page.runtime_state("t").await.unwrap();
        assert_eq!(state.rows.len(), 50);
        assert_eq!(state.columns, vec!["week".to_string(), "units".to_string()]);

        assert_eq!(page.load_more("t").await, Ok(RunOutcome::Applied));
        let state = page.runtime_state("t").await.unwrap();
        assert_eq!(state.rows.len(), 80);
        assert!(!state.paging.unwrap().has_more);
        assert_eq!(
            page.load_more("missing").await,
            Err(DashboardError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_update_content_reruns_on_query_change() {
        let document = GridDocument::new(vec![stored(
            "c",
            Bounds::new(0, 0, 2, 2),
            WidgetKind::Chart(ChartKind::Bar),
            "SELECT week, units FROM forecast",
        )]);
        let fixture = Fixture::new(FakeRepository::with_document("Overview", document));
        fixture.executor.respond("forecast", rows(3));
        let mut page = fixture.open("Overview").await;
        assert_eq!(fixture.executor.calls().len(), 1);

        page.update_content(
            "c",
            WidgetPatch {
                title: Some("Units".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(fixture.executor.calls().len(), 1);

        page.update_content(
            "c",
            WidgetPatch {
                kind: Some(WidgetKind::Chart(ChartKind::Pie)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(fixture.executor.calls().len(), 2);
        assert!(matches!(page.chart_data("c").await, Some(ChartData::Pie { .. })));

        assert_eq!(
            page.update_content("gone", WidgetPatch::default()).await,
            Err(DashboardError::NotFound("gone".to_string()))
        );
    }

    #[tokio::test]
    async fn test_failed_save_keeps_widgets_and_can_retry() {
        let fixture = Fixture::new(FakeRepository::new());
        let mut page = fixture.open("Overview").await;
        fixture.repository.set_failing(true);

        select_region(&mut page, (0, 0), (1, 1));
        page.confirm_widget(WidgetDraft::default()).await.unwrap();
        assert_eq!(page.widgets().len(), 1);
        assert!(matches!(page.save_error(), Some(DashboardError::Persistence(_))));
        assert!(fixture.repository.document("Overview").is_none());

        fixture.repository.set_failing(false);
        assert_eq!(page.retry_save().await, Ok(()));
        assert!(page.save_error().is_none());
        assert_eq!(fixture.repository.document("Overview").unwrap().widgets.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_widget_is_idempotent() {
        let document = GridDocument::new(vec![stored("a", Bounds::new(0, 0, 1, 1), WidgetKind::Card, "")]);
        let fixture = Fixture::new(FakeRepository::with_document("Overview", document));
        let mut page = fixture.open("Overview").await;
        page.click_widget("a");

        assert!(page.remove_widget("a").await.is_some());
        assert!(page.selection().selected().is_none());
        assert!(page.remove_widget("a").await.is_none());
        assert_eq!(fixture.repository.save_count(), 1);
    }
}
