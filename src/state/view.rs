//! Screen state machine
//!
//! The current screen is one tagged value carrying exactly the state that
//! screen needs: the editor draft for create/edit, the orchestrator for
//! generate. Leaving a screen drops its payload.

use std::sync::Arc;

use super::data::{Template, TemplateId};
use super::editor::TemplateDraft;
use super::generation::{GenerationEngine, GenerationOrchestrator};
use crate::error::ViewError;

/// Generate screen payload
#[derive(Debug)]
pub struct GenerateScreen {
    pub orchestrator: GenerationOrchestrator,
    pub selected_template: Option<TemplateId>,
    pub folder: String,
}

#[derive(Debug)]
pub enum Screen {
    List,
    Create(TemplateDraft),
    Edit { id: TemplateId, draft: TemplateDraft },
    Generate(GenerateScreen),
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::List => "list",
            Screen::Create(_) => "create",
            Screen::Edit { .. } => "edit",
            Screen::Generate(_) => "generate",
        }
    }
}

/// Side effects the caller must perform after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    ReloadTemplates,
}

pub struct ViewState {
    screen: Screen,
    templates: Vec<Template>,
    pending_delete: Option<TemplateId>,
    /// Bumped each time an editor opens, so async results can find their draft
    draft_seq: u64,
    engine: Arc<dyn GenerationEngine>,
}

impl ViewState {
    pub fn new(engine: Arc<dyn GenerationEngine>) -> Self {
        Self {
            screen: Screen::List,
            templates: Vec::new(),
            pending_delete: None,
            draft_seq: 0,
            engine,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Replace the caller-held snapshot of the store
    pub fn set_templates(&mut self, templates: Vec<Template>) {
        if let Some(id) = self.pending_delete {
            if !templates.iter().any(|t| t.id == id) {
                self.pending_delete = None;
            }
        }
        self.templates = templates;
    }

    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Draft of the create or edit screen
    pub fn draft(&self) -> Option<&TemplateDraft> {
        match &self.screen {
            Screen::Create(draft) | Screen::Edit { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut TemplateDraft> {
        match &mut self.screen {
            Screen::Create(draft) | Screen::Edit { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Identity of the open draft, captured by work that finishes later
    pub fn draft_seq(&self) -> u64 {
        self.draft_seq
    }

    /// The draft opened as `seq`, or `None` once it has been replaced or left
    pub fn draft_mut_for(&mut self, seq: u64) -> Option<&mut TemplateDraft> {
        if seq != self.draft_seq {
            return None;
        }
        self.draft_mut()
    }

    /// Id of the template on the edit screen
    pub fn editing_id(&self) -> Option<TemplateId> {
        match self.screen {
            Screen::Edit { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn generate(&self) -> Option<&GenerateScreen> {
        match &self.screen {
            Screen::Generate(screen) => Some(screen),
            _ => None,
        }
    }

    pub fn generate_mut(&mut self) -> Option<&mut GenerateScreen> {
        match &mut self.screen {
            Screen::Generate(screen) => Some(screen),
            _ => None,
        }
    }

    fn require_list(&self, to: &'static str) -> Result<(), ViewError> {
        match self.screen {
            Screen::List => Ok(()),
            _ => Err(ViewError::InvalidTransition {
                from: self.screen.name(),
                to,
            }),
        }
    }

    /// List → Create with an empty draft
    pub fn open_create(&mut self) -> Result<(), ViewError> {
        self.require_list("create")?;
        self.pending_delete = None;
        self.draft_seq += 1;
        self.screen = Screen::Create(TemplateDraft::new());
        Ok(())
    }

    /// List → Edit, hydrating the draft from the loaded snapshot
    pub fn open_edit(&mut self, id: TemplateId) -> Result<(), ViewError> {
        self.require_list("edit")?;
        let template = self.template(id).ok_or(ViewError::UnknownTemplate(id))?;
        let draft = TemplateDraft::from_template(template);
        self.pending_delete = None;
        self.draft_seq += 1;
        self.screen = Screen::Edit { id, draft };
        Ok(())
    }

    /// List → Generate with an idle orchestrator
    pub fn open_generate(&mut self) -> Result<(), ViewError> {
        self.require_list("generate")?;
        self.pending_delete = None;
        self.screen = Screen::Generate(GenerateScreen {
            orchestrator: GenerationOrchestrator::new(self.engine.clone()),
            selected_template: None,
            folder: String::new(),
        });
        Ok(())
    }

    /// Any screen → List. Discards the draft or job and asks for a reload.
    pub fn back_to_list(&mut self) -> Vec<Effect> {
        match std::mem::replace(&mut self.screen, Screen::List) {
            Screen::List => Vec::new(),
            Screen::Generate(mut generate) => {
                generate.orchestrator.teardown();
                vec![Effect::ReloadTemplates]
            }
            Screen::Create(_) | Screen::Edit { .. } => vec![Effect::ReloadTemplates],
        }
    }

    pub fn pending_delete(&self) -> Option<TemplateId> {
        self.pending_delete
    }

    /// First step of deletion: ask the user to confirm
    pub fn request_delete(&mut self, id: TemplateId) -> Result<(), ViewError> {
        self.require_list("delete")?;
        if self.template(id).is_none() {
            return Err(ViewError::UnknownTemplate(id));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    /// The user confirmed; returns the id to delete from the store
    pub fn confirm_delete(&mut self) -> Result<TemplateId, ViewError> {
        self.pending_delete.take().ok_or(ViewError::NothingToDelete)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("screen", &self.screen)
            .field("templates", &self.templates.len())
            .field("pending_delete", &self.pending_delete)
            .field("draft_seq", &self.draft_seq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::editor::{DragState, TemplatePreview};
    use crate::state::generation::tests::ScriptedEngine;
    use crate::state::generation::{JobEvent, JobStatus};
    use crate::state::geometry::{Point, Rectangle, RegionKind};
    use futures::StreamExt;
    use std::path::PathBuf;

    fn template(id: TemplateId, crop_photo: &str) -> Template {
        Template {
            id,
            name: "ID Card".to_string(),
            crop_photo: crop_photo.to_string(),
            crop_number: r#"{"x":5,"y":200,"width":40,"height":20}"#.to_string(),
            template_img: "/img/card.png".to_string(),
            created_at: 0,
        }
    }

    fn view_state() -> ViewState {
        let engine = ScriptedEngine::new(vec![50], Ok(PathBuf::from("/out/archive.zip")));
        let mut state = ViewState::new(engine);
        state.set_templates(vec![
            template(1, r#"{"x":10,"y":10,"width":100,"height":150}"#),
            template(2, "corrupt"),
        ]);
        state
    }

    #[test]
    fn test_starts_on_list() {
        let state = view_state();
        assert!(matches!(state.screen(), Screen::List));
        assert!(state.draft().is_none());
        assert!(state.generate().is_none());
    }

    #[test]
    fn test_create_starts_with_undefined_regions() {
        let mut state = view_state();
        state.open_create().unwrap();

        let draft = state.draft().unwrap();
        assert!(draft.name.is_empty());
        assert!(!draft.editor.region(RegionKind::Photo).is_defined());
        assert!(!draft.editor.region(RegionKind::Number).is_defined());
    }

    #[test]
    fn test_edit_hydrates_from_snapshot() {
        let mut state = view_state();
        state.open_edit(1).unwrap();

        assert!(matches!(state.screen(), Screen::Edit { id: 1, .. }));
        assert_eq!(state.editing_id(), Some(1));
        let draft = state.draft().unwrap();
        assert_eq!(
            draft.editor.region(RegionKind::Photo),
            Rectangle::new(10.0, 10.0, 100.0, 150.0)
        );
        assert_eq!(
            draft.editor.region(RegionKind::Number),
            Rectangle::new(5.0, 200.0, 40.0, 20.0)
        );
    }

    #[test]
    fn test_edit_with_corrupt_region_still_opens() {
        let mut state = view_state();
        state.open_edit(2).unwrap();

        let draft = state.draft().unwrap();
        assert_eq!(draft.name, "ID Card");
        assert_eq!(draft.template_img, "/img/card.png");
        assert_eq!(draft.editor.region(RegionKind::Photo), Rectangle::ZERO);
        assert!(draft.editor.region(RegionKind::Number).is_defined());
    }

    #[test]
    fn test_edit_unknown_template() {
        let mut state = view_state();
        assert_eq!(state.open_edit(99), Err(ViewError::UnknownTemplate(99)));
        assert!(matches!(state.screen(), Screen::List));
    }

    #[test]
    fn test_transitions_only_from_list() {
        let mut state = view_state();
        state.open_create().unwrap();

        assert_eq!(
            state.open_generate(),
            Err(ViewError::InvalidTransition {
                from: "create",
                to: "generate"
            })
        );
        assert_eq!(
            state.open_edit(1),
            Err(ViewError::InvalidTransition {
                from: "create",
                to: "edit"
            })
        );
        assert!(matches!(state.screen(), Screen::Create(_)));
    }

    #[test]
    fn test_back_to_list_discards_draft_and_reloads() {
        let mut state = view_state();
        state.open_create().unwrap();
        {
            let draft = state.draft_mut().unwrap();
            draft.name = "Unsaved".to_string();
            draft.editor.begin_drag(Point::new(0.0, 0.0)).unwrap();
        }

        assert_eq!(state.back_to_list(), vec![Effect::ReloadTemplates]);
        assert!(matches!(state.screen(), Screen::List));

        state.open_create().unwrap();
        let draft = state.draft().unwrap();
        assert!(draft.name.is_empty());
        assert_eq!(draft.editor.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_back_to_list_from_list_is_quiet() {
        let mut state = view_state();
        assert!(state.back_to_list().is_empty());
    }

    #[test]
    fn test_generate_starts_idle_and_leaving_drops_the_job() {
        let mut state = view_state();
        state.open_generate().unwrap();
        assert_eq!(
            state.generate().unwrap().orchestrator.status(),
            JobStatus::Idle
        );

        let run = {
            let screen = state.generate_mut().unwrap();
            screen.selected_template = Some(1);
            screen.folder = "/photos".to_string();
            let folder = screen.folder.clone();
            screen.orchestrator.start(screen.selected_template, &folder).unwrap()
        };
        assert_eq!(
            state.generate().unwrap().orchestrator.status(),
            JobStatus::Generating
        );

        assert_eq!(state.back_to_list(), vec![Effect::ReloadTemplates]);

        // Re-entering gives a fresh orchestrator that ignores the old job
        state.open_generate().unwrap();
        let screen = state.generate_mut().unwrap();
        assert!(!screen.orchestrator.apply(JobEvent::Progress {
            job: run.id,
            percent: 80
        }));
        assert_eq!(screen.orchestrator.status(), JobStatus::Idle);
        assert_eq!(screen.folder, "");
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let mut state = view_state();
        assert_eq!(state.confirm_delete(), Err(ViewError::NothingToDelete));

        state.request_delete(1).unwrap();
        assert_eq!(state.pending_delete(), Some(1));
        state.cancel_delete();
        assert_eq!(state.confirm_delete(), Err(ViewError::NothingToDelete));

        state.request_delete(2).unwrap();
        assert_eq!(state.confirm_delete(), Ok(2));
        assert_eq!(state.pending_delete(), None);
    }

    #[test]
    fn test_reload_clears_stale_delete_request() {
        let mut state = view_state();
        state.request_delete(2).unwrap();
        state.set_templates(vec![template(1, "{}")]);
        assert_eq!(state.pending_delete(), None);
    }

    #[test]
    fn test_create_has_no_editing_id() {
        let mut state = view_state();
        state.open_create().unwrap();
        assert_eq!(state.editing_id(), None);
    }

    #[test]
    fn test_late_preview_does_not_reach_a_newer_draft() {
        let mut state = view_state();
        state.open_edit(1).unwrap();
        let first = state.draft_seq();

        // The first editor is left before its image finishes loading
        state.back_to_list();
        state.open_edit(2).unwrap();
        let second = state.draft_seq();
        assert_ne!(first, second);

        assert!(state.draft_mut_for(first).is_none());
        assert_eq!(state.draft().unwrap().template_img, "/img/card.png");
        assert!(state.draft().unwrap().preview.is_none());

        let preview = TemplatePreview {
            path: PathBuf::from("/img/other.png"),
            width: 300,
            height: 200,
        };
        state.draft_mut_for(second).unwrap().set_image(preview);
        assert_eq!(state.draft().unwrap().template_img, "/img/other.png");
    }

    #[test]
    fn test_draft_seq_changes_between_create_screens() {
        let mut state = view_state();
        state.open_create().unwrap();
        let first = state.draft_seq();
        state.back_to_list();
        state.open_create().unwrap();

        assert!(state.draft_mut_for(first).is_none());
        assert!(state.draft_mut_for(state.draft_seq()).is_some());

        state.back_to_list();
        assert!(state.draft_mut_for(state.draft_seq()).is_none());
    }

    #[tokio::test]
    async fn test_bare_key_template_edits_and_generates() {
        let engine = ScriptedEngine::new(
            vec![0, 25, 60, 100],
            Ok(PathBuf::from("/out/archive.zip")),
        );
        let mut state = ViewState::new(engine);
        state.set_templates(vec![Template {
            id: 1,
            name: "ID Card".to_string(),
            crop_photo: "{x:10,y:10,width:100,height:150}".to_string(),
            crop_number: "{x:5,y:200,width:40,height:20}".to_string(),
            template_img: "/img/card.png".to_string(),
            created_at: 0,
        }]);

        state.open_edit(1).unwrap();
        let draft = state.draft().unwrap();
        assert_eq!(
            draft.editor.region(RegionKind::Photo),
            Rectangle::new(10.0, 10.0, 100.0, 150.0)
        );
        assert_eq!(
            draft.editor.region(RegionKind::Number),
            Rectangle::new(5.0, 200.0, 40.0, 20.0)
        );
        state.back_to_list();

        state.open_generate().unwrap();
        let screen = state.generate_mut().unwrap();
        screen.selected_template = Some(1);
        screen.folder = "/photos".to_string();
        let folder = screen.folder.clone();
        let run = screen.orchestrator.start(screen.selected_template, &folder).unwrap();

        let events: Vec<JobEvent> = run.into_stream().collect().await;
        let mut seen = Vec::new();
        for event in events {
            if let JobEvent::Progress { percent, .. } = &event {
                seen.push(*percent);
            }
            screen.orchestrator.apply(event);
        }

        assert_eq!(seen, vec![0, 25, 60, 100]);
        let job = screen.orchestrator.job().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress, 100);
        assert_eq!(job.archive_path, Some(PathBuf::from("/out/archive.zip")));
    }
}
