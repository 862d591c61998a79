use iced::task::Handle;
use iced::widget::{column, container};
use iced::{Element, Length, Task, Theme};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod engine;
mod error;
mod files;
mod state;
mod ui;

use config::AppConfig;
use error::{FileError, StoreError};
use state::data::{Template, TemplateId};
use state::editor::TemplatePreview;
use state::generation::{JobEvent, JobStatus};
use state::geometry::{Point, RegionKind};
use state::library;
use state::view::{Effect, Screen, ViewState};
use ui::views::{self, Notice, TemplateChoice};

/// Main application state
struct PhotoTemplater {
    config: AppConfig,
    /// Current screen and the loaded template snapshot
    view: ViewState,
    /// Inline message shown above the screen
    notice: Option<Notice>,
    /// A create/update call is in flight
    saving: bool,
    /// Handle of the task driving the current job's event stream
    job_task: Option<Handle>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Store snapshot (re)loaded
    TemplatesLoaded(Result<Vec<Template>, StoreError>),

    // Navigation
    ShowList,
    NewTemplate,
    EditTemplate(TemplateId),
    OpenGenerate,

    // Deletion, confirmed in two steps
    DeleteRequested(TemplateId),
    DeleteConfirmed,
    DeleteCancelled,
    Deleted(Result<(), StoreError>),

    // Editor
    NameChanged(String),
    PickTemplateImage,
    TemplateImagePicked(Option<PathBuf>),
    /// Results for the draft opened as the given sequence number
    TemplateImageSaved(u64, Result<PathBuf, FileError>),
    PreviewLoaded(u64, Result<TemplatePreview, FileError>),
    RegionModeSelected(RegionKind),
    CropPressed(Point),
    CropMoved(Point),
    CropReleased,
    SaveTemplate,
    TemplateSaved(Result<Template, StoreError>),

    // Generation
    TemplateSelected(TemplateChoice),
    FolderChanged(String),
    BrowseFolder,
    FolderPicked(Option<PathBuf>),
    StartGeneration,
    CancelGeneration,
    Job(JobEvent),
    OpenArchive,

    DismissNotice,
}

impl PhotoTemplater {
    fn new(config: AppConfig) -> (Self, Task<Message>) {
        let engine = Arc::new(engine::ImageEngine::new(
            config.database_path(),
            config.output_dir(),
        ));
        let app = PhotoTemplater {
            view: ViewState::new(engine),
            config,
            notice: None,
            saving: false,
            job_task: None,
        };

        let load = app.reload_templates();
        (app, load)
    }

    fn db_path(&self) -> PathBuf {
        self.config.database_path()
    }

    fn reload_templates(&self) -> Task<Message> {
        Task::perform(library::list_templates(self.db_path()), Message::TemplatesLoaded)
    }

    fn run_effects(&self, effects: Vec<Effect>) -> Task<Message> {
        Task::batch(effects.into_iter().map(|effect| match effect {
            Effect::ReloadTemplates => self.reload_templates(),
        }))
    }

    /// Stop driving the current job's event stream
    fn abort_job_task(&mut self) {
        if let Some(handle) = self.job_task.take() {
            handle.abort();
        }
    }

    fn load_preview(seq: u64, path: PathBuf) -> Task<Message> {
        Task::perform(
            async move {
                let (width, height) = files::image_dimensions(path.clone()).await?;
                Ok::<_, FileError>(TemplatePreview {
                    path,
                    width,
                    height,
                })
            },
            move |result| Message::PreviewLoaded(seq, result),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TemplatesLoaded(Ok(templates)) => {
                log::debug!("Loaded {} templates", templates.len());
                self.view.set_templates(templates);
            }
            Message::TemplatesLoaded(Err(e)) => {
                log::error!("❌ Failed to load templates: {}", e);
                self.notice = Some(Notice::error(e));
            }

            Message::ShowList => {
                self.abort_job_task();
                self.saving = false;
                self.notice = None;
                let effects = self.view.back_to_list();
                return self.run_effects(effects);
            }
            Message::NewTemplate => {
                self.notice = None;
                if let Err(e) = self.view.open_create() {
                    self.notice = Some(Notice::error(e));
                }
            }
            Message::EditTemplate(id) => {
                self.notice = None;
                if let Err(e) = self.view.open_edit(id) {
                    self.notice = Some(Notice::error(e));
                    return Task::none();
                }
                if let Some(draft) = self.view.draft() {
                    return Self::load_preview(
                        self.view.draft_seq(),
                        PathBuf::from(&draft.template_img),
                    );
                }
            }
            Message::OpenGenerate => {
                self.notice = None;
                if let Err(e) = self.view.open_generate() {
                    self.notice = Some(Notice::error(e));
                }
            }

            Message::DeleteRequested(id) => {
                if let Err(e) = self.view.request_delete(id) {
                    self.notice = Some(Notice::error(e));
                }
            }
            Message::DeleteConfirmed => match self.view.confirm_delete() {
                Ok(id) => {
                    return Task::perform(
                        library::delete_template(self.db_path(), id),
                        Message::Deleted,
                    );
                }
                Err(e) => self.notice = Some(Notice::error(e)),
            },
            Message::DeleteCancelled => self.view.cancel_delete(),
            Message::Deleted(result) => {
                if let Err(e) = result {
                    self.notice = Some(Notice::error(e));
                }
                return self.reload_templates();
            }

            Message::NameChanged(name) => {
                if let Some(draft) = self.view.draft_mut() {
                    draft.name = name;
                }
            }
            Message::PickTemplateImage => {
                return Task::perform(files::pick_template_image(), Message::TemplateImagePicked);
            }
            Message::TemplateImagePicked(Some(source)) => {
                let seq = self.view.draft_seq();
                return Task::perform(
                    files::save_template_image(self.config.images_dir(), source),
                    move |result| Message::TemplateImageSaved(seq, result),
                );
            }
            Message::TemplateImagePicked(None) => {}
            Message::TemplateImageSaved(seq, Ok(path)) => return Self::load_preview(seq, path),
            Message::TemplateImageSaved(seq, Err(e)) | Message::PreviewLoaded(seq, Err(e)) => {
                if seq == self.view.draft_seq() && self.view.draft().is_some() {
                    log::warn!("⚠️  Template image unavailable: {}", e);
                    self.notice = Some(Notice::error(e));
                }
            }
            Message::PreviewLoaded(seq, Ok(preview)) => {
                // The editor that asked may have been closed or replaced meanwhile
                match self.view.draft_mut_for(seq) {
                    Some(draft) => draft.set_image(preview),
                    None => log::debug!("Dropping preview for closed draft {}", seq),
                }
            }
            Message::RegionModeSelected(kind) => {
                if let Some(draft) = self.view.draft_mut() {
                    if let Err(e) = draft.editor.set_mode(kind) {
                        log::debug!("Ignoring mode change: {}", e);
                    }
                }
            }
            Message::CropPressed(point) => {
                if let Some(draft) = self.view.draft_mut() {
                    if let Err(e) = draft.editor.begin_drag(point) {
                        log::debug!("Ignoring press: {}", e);
                    }
                }
            }
            Message::CropMoved(point) => {
                if let Some(draft) = self.view.draft_mut() {
                    draft.editor.update_drag(point);
                }
            }
            Message::CropReleased => {
                if let Some(region) = self.view.draft_mut().and_then(|draft| draft.end_drag()) {
                    log::debug!("Committed {} region", region);
                }
            }
            Message::SaveTemplate => {
                if self.saving {
                    return Task::none();
                }
                let Some(draft) = self.view.draft() else {
                    return Task::none();
                };
                let fields = match draft.to_fields() {
                    Ok(fields) => fields,
                    Err(e) => {
                        self.notice = Some(Notice::error(e));
                        return Task::none();
                    }
                };

                self.saving = true;
                self.notice = None;
                let db_path = self.db_path();
                return match self.view.editing_id() {
                    Some(id) => Task::perform(
                        library::update_template(db_path, id, fields),
                        Message::TemplateSaved,
                    ),
                    None => Task::perform(
                        library::create_template(db_path, fields),
                        Message::TemplateSaved,
                    ),
                };
            }
            Message::TemplateSaved(result) => {
                self.saving = false;
                match result {
                    Ok(template) => {
                        self.notice = Some(Notice::info(format!("Saved \"{}\"", template.name)));
                        let effects = self.view.back_to_list();
                        return self.run_effects(effects);
                    }
                    Err(e) => self.notice = Some(Notice::error(e)),
                }
            }

            Message::TemplateSelected(choice) => {
                if let Some(screen) = self.view.generate_mut() {
                    screen.selected_template = Some(choice.id);
                }
            }
            Message::FolderChanged(folder) => {
                if let Some(screen) = self.view.generate_mut() {
                    screen.folder = folder;
                }
            }
            Message::BrowseFolder => {
                return Task::perform(files::pick_folder(), Message::FolderPicked);
            }
            Message::FolderPicked(Some(folder)) => {
                if let Some(screen) = self.view.generate_mut() {
                    screen.folder = folder.to_string_lossy().to_string();
                }
            }
            Message::FolderPicked(None) => {}
            Message::StartGeneration => {
                let Some(screen) = self.view.generate_mut() else {
                    return Task::none();
                };
                let folder = screen.folder.clone();
                match screen.orchestrator.start(screen.selected_template, &folder) {
                    Ok(run) => {
                        self.notice = None;
                        self.abort_job_task();
                        let (task, handle) = Task::run(run.into_stream(), Message::Job).abortable();
                        self.job_task = Some(handle);
                        return task;
                    }
                    Err(e) => self.notice = Some(Notice::error(e)),
                }
            }
            Message::CancelGeneration => {
                self.abort_job_task();
                if let Some(screen) = self.view.generate_mut() {
                    screen.orchestrator.teardown();
                    self.notice = Some(Notice::info("Generation cancelled"));
                }
            }
            Message::Job(event) => {
                let finished = matches!(event, JobEvent::Finished { .. });
                let Some(screen) = self.view.generate_mut() else {
                    return Task::none();
                };
                if screen.orchestrator.apply(event) && finished {
                    if let Some(job) = screen.orchestrator.job() {
                        if let (JobStatus::Failed, Some(e)) = (job.status, &job.error) {
                            self.notice = Some(Notice::error(e.clone()));
                        }
                    }
                    self.job_task = None;
                }
            }
            Message::OpenArchive => {
                let archive = self
                    .view
                    .generate()
                    .and_then(|screen| screen.orchestrator.job())
                    .and_then(|job| job.archive_path.clone());
                if let Some(path) = archive {
                    if let Err(e) = files::open_archive(&path) {
                        self.notice = Some(Notice::error(e));
                    }
                }
            }

            Message::DismissNotice => self.notice = None,
        }

        Task::none()
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let screen = match self.view.screen() {
            Screen::List => views::list_view(self.view.templates(), self.view.pending_delete()),
            Screen::Create(draft) => views::editor_view(draft, "New Template", self.saving),
            Screen::Edit { draft, .. } => views::editor_view(draft, "Edit Template", self.saving),
            Screen::Generate(generate) => views::generate_view(generate, self.view.templates()),
        };

        let mut content = column![].spacing(16).padding(24);
        if let Some(notice) = &self.notice {
            content = content.push(views::notice_bar(notice));
        }
        content = content.push(screen);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    let config = AppConfig::load();
    config::init_logging(config.log_level);

    // The only fatal error: without its database the app cannot function
    if let Err(e) = library::Library::open(&config.database_path()) {
        log::error!(
            "❌ Failed to open template database {}: {}",
            config.database_path().display(),
            e
        );
        std::process::exit(1);
    }
    log::info!("🎨 Photo Templater starting with data in {}", config.data_dir.display());

    iced::application("Photo Templater", PhotoTemplater::update, PhotoTemplater::view)
        .theme(PhotoTemplater::theme)
        .centered()
        .run_with(move || PhotoTemplater::new(config))
}
