//! The local backend: capability interface over a `CalendarStore`.

use std::sync::Arc;

use async_trait::async_trait;
use calbridge_core::backend::CalendarBackend;
use calbridge_core::date_range::DateRange;
use calbridge_core::error::{CalendarError, CalendarResult, Reason};
use calbridge_core::matcher::position_of_match;
use calbridge_core::timezone::DstAdjuster;
use calbridge_core::{AddMethod, AddOutcome, EventModel};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::broadcast;

use crate::editor::{EditingEnded, EventEditor};
use crate::gate::LocalAuthorizationGate;
use crate::html::plain_text;
use crate::store::{CalendarStore, NativeEvent};

pub const EVENT_ADDED: &str = "Local calendar event added";
pub const EVENT_REMOVED: &str = "Local calendar event removed";

const EDITING_ENDED_CAPACITY: usize = 16;

pub struct LocalBackend {
    store: Arc<dyn CalendarStore>,
    gate: LocalAuthorizationGate,
    adjuster: DstAdjuster,
    editor: Option<Arc<dyn EventEditor>>,
    editing_ended: broadcast::Sender<EditingEnded>,
}

impl LocalBackend {
    /// Backend over `store`, whose wall-clock times are read in `tz`.
    pub fn new(store: Arc<dyn CalendarStore>, tz: Tz) -> Self {
        let (editing_ended, _) = broadcast::channel(EDITING_ENDED_CAPACITY);

        LocalBackend {
            gate: LocalAuthorizationGate::new(store.clone()),
            store,
            adjuster: DstAdjuster::new(tz),
            editor: None,
            editing_ended,
        }
    }

    /// Editor used by `AddMethod::FromModal`. Without one, modal adds fail
    /// with `ModalNotAvailable`.
    pub fn with_editor(mut self, editor: Arc<dyn EventEditor>) -> Self {
        self.editor = Some(editor);
        self
    }

    /// Clock deciding which side of a DST transition "now" is on.
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.adjuster = self.adjuster.with_clock(now);
        self
    }

    /// Notifications sent each time a presented editor is dismissed.
    pub fn subscribe_editing_ended(&self) -> broadcast::Receiver<EditingEnded> {
        self.editing_ended.subscribe()
    }

    /// `model` with the instants a write would store.
    fn adjusted(&self, model: &EventModel) -> EventModel {
        let (start, end) = self.adjuster.adjust(model.start, model.end);

        let mut adjusted = model.clone();
        adjusted.start = start;
        adjusted.end = end;
        adjusted
    }

    /// Native record to write for `model`: DST-adjusted, markup rendered.
    fn draft(&self, model: &EventModel) -> NativeEvent {
        let adjusted = self.adjusted(model);

        let mut native = NativeEvent::from_model(&adjusted, self.store.default_calendar());
        native.title = plain_text(&native.title);
        native.notes = plain_text(&native.notes);
        native
    }

    async fn list(&self, range: &DateRange) -> CalendarResult<Vec<NativeEvent>> {
        if !range.is_valid() {
            return Err(Reason::ListUnavailable.into());
        }

        self.store
            .events(range.from, range.to)
            .await
            .map_err(CalendarError::underlying)
    }

    /// Index of the first of `candidates` matching `event` as given or as
    /// a write would have stored it.
    fn position_in(&self, event: &EventModel, candidates: &[EventModel]) -> Option<usize> {
        position_of_match(event, candidates)
            .or_else(|| position_of_match(&self.adjusted(event), candidates))
    }

    async fn contains(&self, event: &EventModel) -> CalendarResult<bool> {
        let adjusted = self.adjusted(event);
        let window = DateRange::new(
            event.start.min(adjusted.start),
            event.end.max(adjusted.end),
        );
        let existing: Vec<EventModel> = self
            .list(&window)
            .await?
            .iter()
            .map(EventModel::from)
            .collect();

        Ok(self.position_in(event, &existing).is_some())
    }

    async fn add_now(&self, event: EventModel) -> CalendarResult<AddOutcome> {
        self.gate.ensure_authorized().await?;
        event.validate()?;

        if self.contains(&event).await? {
            tracing::debug!(title = %event.title, "local event already present");
            return Err(Reason::EventAlreadyExists.into());
        }

        let saved = self
            .store
            .save(self.draft(&event))
            .await
            .map_err(CalendarError::underlying)?;

        tracing::info!(
            id = saved.id.as_deref().unwrap_or_default(),
            calendar = %saved.calendar,
            "added local event"
        );
        Ok(AddOutcome::Added(EVENT_ADDED.to_string()))
    }

    async fn present_editor(&self, event: Option<EventModel>) -> CalendarResult<AddOutcome> {
        let Some(editor) = self.editor.clone() else {
            return Err(Reason::ModalNotAvailable.into());
        };

        self.gate.ensure_authorized().await?;

        let draft = event.as_ref().map(|e| self.draft(e));
        let editing_ended = self.editing_ended.clone();

        tokio::spawn(async move {
            let action = editor.edit(draft).await;
            tracing::debug!(?action, "local event editor dismissed");
            // Nobody listening is fine
            let _ = editing_ended.send(EditingEnded { action });
        });

        Ok(AddOutcome::EditorPresented)
    }
}

#[async_trait]
impl CalendarBackend for LocalBackend {
    async fn add_event(&self, method: AddMethod) -> CalendarResult<AddOutcome> {
        match method {
            AddMethod::Easy(event) => self.add_now(event).await,
            AddMethod::FromModal(event) => self.present_editor(event).await,
        }
    }

    async fn remove_event(
        &self,
        event: &EventModel,
        range: Option<DateRange>,
    ) -> CalendarResult<String> {
        self.gate.ensure_authorized().await?;

        let range = range.unwrap_or_else(DateRange::default_removal_window);
        let natives = self.list(&range).await?;
        let models: Vec<EventModel> = natives.iter().map(EventModel::from).collect();

        let Some(index) = self.position_in(event, &models) else {
            return Err(Reason::CantFindEvent.into());
        };

        let native = &natives[index];
        self.store
            .remove(native)
            .await
            .map_err(CalendarError::underlying)?;

        tracing::info!(
            id = native.id.as_deref().unwrap_or_default(),
            "removed local event"
        );
        Ok(EVENT_REMOVED.to_string())
    }

    async fn events(&self, range: &DateRange) -> CalendarResult<Vec<EventModel>> {
        self.gate.ensure_authorized().await?;

        let natives = self.list(range).await?;
        Ok(natives.iter().map(EventModel::from).collect())
    }

    async fn event_exists(&self, event: &EventModel) -> CalendarResult<bool> {
        self.gate.ensure_authorized().await?;
        self.contains(event).await
    }
}
