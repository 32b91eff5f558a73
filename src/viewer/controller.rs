use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::Receiver;
use log::{debug, error, info, warn};

use crate::annotations::{Annotation, AnnotationOverlay, OverlayEvent};
use crate::config::{HostConfig, ScrollTarget, ViewerConfig};
use crate::error::{ConfigError, DocumentLoadError, ViewerError};
use crate::pdf::{
    Command, ContainerSize, Document, DocumentLayout, DocumentSource, Effect, Generation,
    InputSource, PdfBackend, Phase, RenderParams, RenderResponse, RenderService, RenderState,
    RenderedPage, Zoom, ZoomMode, check_pdf_header, compute_layout,
};
use crate::result::{InteractionResult, ResultReporter};
use crate::settings::EngineSettings;
use crate::surface::{self, PageContent, Surface};

use super::debounce::Debouncer;

/// What is on a page's canvas, and the parameters it was produced with
struct PageSurface {
    params: RenderParams,
    content: SurfaceContent,
}

enum SurfaceContent {
    Painted(Arc<RenderedPage>),
    Failed,
}

/// One embedded viewer.
///
/// Owns its document, worker pool, cache, layout and surfaces. The host
/// drives it from a single thread: feed it container sizes, scroll offsets
/// and zoom commands, call [`tick`] or [`poll`] to collect finished renders,
/// and read back [`surface`] and [`result`].
///
/// [`tick`]: ViewportController::tick
/// [`poll`]: ViewportController::poll
/// [`surface`]: ViewportController::surface
/// [`result`]: ViewportController::result
pub struct ViewportController<B: PdfBackend> {
    source: DocumentSource<B>,
    settings: EngineSettings,
    state: RenderState,
    config: ViewerConfig,
    pending_input: Option<InputSource>,
    document: Option<Document<B>>,
    legacy_bytes: Option<Arc<[u8]>>,
    load_error: Option<DocumentLoadError>,
    service: Option<RenderService>,
    layout: Option<DocumentLayout>,
    pages: HashMap<usize, PageSurface>,
    pending_target: Option<ScrollTarget>,
    resize: Debouncer<ContainerSize>,
    overlay: AnnotationOverlay,
    reporter: ResultReporter,
}

impl<B: PdfBackend> ViewportController<B> {
    #[must_use]
    pub fn new(backend: B, settings: EngineSettings) -> Self {
        let resize = Debouncer::new(settings.resize_debounce());
        Self {
            source: DocumentSource::new(backend),
            settings,
            state: RenderState::new(),
            config: ViewerConfig::default(),
            pending_input: None,
            document: None,
            legacy_bytes: None,
            load_error: None,
            service: None,
            layout: None,
            pages: HashMap::new(),
            pending_target: None,
            resize,
            overlay: AnnotationOverlay::new(),
            reporter: ResultReporter::new(),
        }
    }

    /// Load a document and lay it out.
    ///
    /// Configuration problems that need the document (page ranges, scroll
    /// targets) are returned here and leave the viewer unmounted. Load
    /// failures are not errors for the caller: the viewer stays empty and the
    /// reason is available from [`ViewportController::load_error`].
    pub fn mount(
        &mut self,
        config: ViewerConfig,
        input: InputSource,
        container: ContainerSize,
    ) -> Result<(), ConfigError> {
        if self.state.phase != Phase::Unmounted {
            self.unmount();
        }
        info!(
            "Mounting viewer ({:?}) in {}x{} container",
            config.rendering_mode, container.width, container.height
        );
        self.config = config;
        self.load_error = None;
        self.pending_input = Some(input);
        let effects = self.state.apply(Command::Mount(container));
        self.run(effects)
    }

    /// Mount from a host configuration that carries the document as its
    /// base64 `source`.
    ///
    /// Unlike [`mount`](ViewportController::mount), a document that fails to
    /// load is returned as an error; the viewer is still left empty.
    pub fn mount_host(
        &mut self,
        mut host: HostConfig,
        container: ContainerSize,
    ) -> Result<(), ViewerError> {
        let source = host.source.take().ok_or(ConfigError::MissingSource)?;
        let config = ViewerConfig::from_host(host)?;
        self.mount(config, InputSource::Base64(source), container)?;
        match &self.load_error {
            Some(e) => Err(e.clone().into()),
            None => Ok(()),
        }
    }

    /// Release the document, workers and every surface
    pub fn unmount(&mut self) {
        let effects = self.state.apply(Command::Unmount);
        if let Err(e) = self.run(effects) {
            error!("Unmount failed: {e}");
        }
    }

    /// Replace the configuration snapshot.
    ///
    /// Switching between engine and legacy presentation remounts from the
    /// bytes already loaded. A scroll target in the new snapshot is applied
    /// once after the relayout.
    pub fn reconfigure(&mut self, config: ViewerConfig) -> Result<(), ConfigError> {
        if let Some(document) = &self.document {
            config.check_against(document.page_count())?;
        }

        if config.rendering_mode != self.config.rendering_mode {
            let bytes = self.bytes();
            let container = self.state.container;
            self.unmount();
            return match bytes {
                Some(bytes) => self.mount(config, InputSource::Bytes(bytes.to_vec()), container),
                None => {
                    self.config = config;
                    Ok(())
                }
            };
        }

        self.pending_target = config.scroll_target;
        let scroll_target = self.pending_target.is_some();
        self.config = config;
        let effects = self.state.apply(Command::Reconfigure { scroll_target });
        self.run(effects)
    }

    /// Report a new container size. Bursts are coalesced; the relayout
    /// happens on the first [`tick`](ViewportController::tick) after the
    /// debounce window.
    pub fn resize(&mut self, container: ContainerSize, now: Instant) {
        if self.state.phase.has_layout() {
            self.resize.push(container, now);
        } else {
            // Nothing laid out yet: the size is simply used by the first layout
            let _ = self.state.apply(Command::SetContainer(container));
        }
    }

    /// Apply a debounced resize if due, then collect finished renders
    pub fn tick(&mut self, now: Instant) -> Result<usize, ConfigError> {
        if let Some(container) = self.resize.take_ready(now) {
            self.apply_container(container)?;
        }
        Ok(self.poll())
    }

    /// Apply a pending resize immediately
    pub fn flush_resize(&mut self) -> Result<(), ConfigError> {
        match self.resize.flush() {
            Some(container) => self.apply_container(container),
            None => Ok(()),
        }
    }

    /// When the pending resize becomes due, so an event loop knows when to
    /// call [`tick`](ViewportController::tick) next
    #[must_use]
    pub fn resize_deadline(&self) -> Option<Instant> {
        self.resize.deadline()
    }

    fn apply_container(&mut self, container: ContainerSize) -> Result<(), ConfigError> {
        debug!("Container resized to {}x{}", container.width, container.height);
        let effects = self.state.apply(Command::SetContainer(container));
        self.run(effects)
    }

    /// Scroll the viewer to a content offset, clamped to the scrollable range
    pub fn scroll_to(&mut self, top: f32) {
        let Some(layout) = &self.layout else {
            return;
        };
        let top = top.clamp(0.0, layout.max_scroll_top());
        let effects = self.state.apply(Command::ScrollTo(top));
        if let Err(e) = self.run(effects) {
            error!("Scroll failed: {e}");
        }
    }

    /// Scroll so the target's top aligns with the viewport top
    pub fn scroll_to_target(&mut self, target: ScrollTarget) -> Result<(), ConfigError> {
        if let Some(document) = &self.document {
            let candidate = ViewerConfig {
                scroll_target: Some(target),
                ..self.config.clone()
            };
            candidate.check_against(document.page_count())?;
        }
        self.pending_target = Some(target);
        if self.state.phase.has_layout() {
            self.apply_scroll_target();
            self.render_visible();
        }
        Ok(())
    }

    pub fn zoom_in(&mut self) -> Result<(), ConfigError> {
        let current = self.current_scale();
        self.update_zoom(|zoom| zoom.step_in(current))
    }

    pub fn zoom_out(&mut self) -> Result<(), ConfigError> {
        let current = self.current_scale();
        self.update_zoom(|zoom| zoom.step_out(current))
    }

    /// Select a zoom panel preset by index into [`Zoom::PRESETS`]
    pub fn zoom_preset(&mut self, index: usize) -> Result<(), ConfigError> {
        if index >= Zoom::PRESETS.len() {
            return Err(ConfigError::UnknownZoom(format!("preset {index}")));
        }
        self.update_zoom(|zoom| {
            zoom.preset(index);
        })
    }

    pub fn actual_size(&mut self) -> Result<(), ConfigError> {
        self.update_zoom(Zoom::actual_size)
    }

    pub fn fit_width(&mut self) -> Result<(), ConfigError> {
        self.update_zoom(Zoom::fit_width)
    }

    pub fn fit_height(&mut self) -> Result<(), ConfigError> {
        self.update_zoom(Zoom::fit_height)
    }

    /// Apply a value typed into the zoom input ("150%" or "1.5")
    pub fn set_manual_zoom(&mut self, input: &str) -> Result<(), ConfigError> {
        let mut zoom = Zoom::new(self.config.zoom);
        zoom.set_manual(input)?;
        self.set_zoom(zoom.mode())
    }

    fn update_zoom(&mut self, f: impl FnOnce(&mut Zoom)) -> Result<(), ConfigError> {
        let mut zoom = Zoom::new(self.config.zoom);
        f(&mut zoom);
        self.set_zoom(zoom.mode())
    }

    /// Change the zoom mode, keeping the page at the top of the viewport in
    /// place
    pub fn set_zoom(&mut self, mode: ZoomMode) -> Result<(), ConfigError> {
        let config = self.config.with_zoom(mode)?;
        if config == self.config {
            return Ok(());
        }
        let anchor = self
            .layout
            .as_ref()
            .and_then(|l| l.page_at_offset(self.state.scroll_top));
        debug!("Zoom {:?} -> {mode:?}, anchored on page {anchor:?}", self.config.zoom);

        self.config = config;
        self.pending_target = anchor.map(ScrollTarget::Page);
        let effects = self.state.apply(Command::Reconfigure {
            scroll_target: anchor.is_some(),
        });
        self.run(effects)
    }

    /// Scale of the page at the top of the viewport
    #[must_use]
    pub fn current_scale(&self) -> f32 {
        if let Some(layout) = &self.layout {
            let page = layout
                .page_at_offset(self.state.scroll_top)
                .and_then(|p| layout.page(p));
            if let Some(page) = page {
                return page.scale;
            }
        }
        match self.config.zoom {
            ZoomMode::Factor(z) => z,
            ZoomMode::FitWidth | ZoomMode::FitHeight => 1.0,
        }
    }

    /// Collect finished renders. Returns the number of pages painted.
    pub fn poll(&mut self) -> usize {
        let Some(service) = &mut self.service else {
            return 0;
        };
        let responses = service.poll();
        self.apply_responses(responses)
    }

    /// Block until no render is outstanding. Returns false on timeout.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if self.state.phase != Phase::Rendering {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let Some(service) = &mut self.service else {
                return true;
            };
            let responses = service.wait(deadline - now);
            self.apply_responses(responses);
        }
    }

    /// Hit-test a click in viewer content coordinates.
    ///
    /// A hit is recorded for [`result`](ViewportController::result) and,
    /// when click events are enabled, sent to every subscriber.
    pub fn click(&mut self, x: f32, y: f32) -> Option<Annotation> {
        let hit = self.overlay.hit_test(x, y)?;
        let annotation = hit.annotation.clone();
        debug!("Annotation {} clicked at ({x}, {y})", hit.index);

        self.reporter.record_click(annotation.clone());
        if self.config.emit_annotation_clicks {
            self.overlay
                .emit(&OverlayEvent::AnnotationClicked(annotation.clone()));
        }
        Some(annotation)
    }

    /// Receive annotation click events
    pub fn subscribe(&mut self) -> Receiver<OverlayEvent> {
        self.overlay.subscribe()
    }

    /// Pages whose box intersects the visible band
    #[must_use]
    pub fn visible_pages(&self) -> Vec<usize> {
        self.layout
            .as_ref()
            .map_or_else(Vec::new, |layout| layout.visible_pages(self.state.scroll_top))
    }

    /// Snapshot of the interaction state for the host
    #[must_use]
    pub fn result(&self) -> InteractionResult {
        let scroll_top = self.layout.as_ref().map(|_| self.state.scroll_top);
        self.reporter.snapshot(self.visible_pages(), scroll_top)
    }

    /// Describe what is currently on screen
    #[must_use]
    pub fn surface(&self) -> Surface {
        if self.state.phase == Phase::Presented {
            if let Some(bytes) = &self.legacy_bytes {
                return Surface::Legacy(surface::legacy_surface(&self.config, bytes));
            }
        }
        match &self.layout {
            Some(layout) if self.state.phase.has_layout() => {
                Surface::Viewer(surface::viewer_surface(
                    layout,
                    &self.config,
                    self.state.container,
                    &self.overlay,
                    |page| match self.pages.get(&page).map(|s| &s.content) {
                        None => PageContent::Pending,
                        Some(SurfaceContent::Painted(rendered)) => {
                            PageContent::Painted(Arc::as_ref(rendered))
                        }
                        Some(SurfaceContent::Failed) => PageContent::Failed,
                    },
                ))
            }
            _ => Surface::Empty,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.state.generation
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> Option<&DocumentLayout> {
        self.layout.as_ref()
    }

    #[must_use]
    pub fn container(&self) -> ContainerSize {
        self.state.container
    }

    #[must_use]
    pub fn scroll_top(&self) -> f32 {
        self.state.scroll_top
    }

    /// Why the last mount produced nothing
    #[must_use]
    pub fn load_error(&self) -> Option<&DocumentLoadError> {
        self.load_error.as_ref()
    }

    /// Painted content of a page, if any
    #[must_use]
    pub fn rendered_page(&self, page: usize) -> Option<&RenderedPage> {
        match self.pages.get(&page).map(|s| &s.content) {
            Some(SurfaceContent::Painted(rendered)) => Some(Arc::as_ref(rendered)),
            _ => None,
        }
    }

    /// Whether the last attempt to render the page failed
    #[must_use]
    pub fn page_failed(&self, page: usize) -> bool {
        matches!(
            self.pages.get(&page).map(|s| &s.content),
            Some(SurfaceContent::Failed)
        )
    }

    /// Render results dropped because a newer layout had started
    #[must_use]
    pub fn discarded_results(&self) -> usize {
        self.service.as_ref().map_or(0, RenderService::discarded)
    }

    fn bytes(&self) -> Option<Arc<[u8]>> {
        self.document
            .as_ref()
            .map(Document::bytes)
            .or_else(|| self.legacy_bytes.clone())
    }

    fn run(&mut self, effects: Vec<Effect>) -> Result<(), ConfigError> {
        for effect in effects {
            match effect {
                Effect::LoadDocument => self.load_document()?,
                Effect::Relayout => self.relayout()?,
                Effect::ScrollToTarget => self.apply_scroll_target(),
                Effect::RenderVisible => self.render_visible(),
                Effect::Teardown => self.teardown(),
            }
        }
        Ok(())
    }

    fn load_document(&mut self) -> Result<(), ConfigError> {
        let Some(input) = self.pending_input.take() else {
            return Ok(());
        };

        if self.config.rendering_mode.is_legacy() {
            warn!(
                "Rendering mode {:?} hands the document to the browser's PDF viewer; \
                 display differs between browsers",
                self.config.rendering_mode
            );
            match input
                .into_bytes()
                .and_then(|bytes| check_pdf_header(&bytes).map(|()| bytes))
            {
                Ok(bytes) => {
                    self.legacy_bytes = Some(Arc::from(bytes));
                    let _ = self.state.apply(Command::LegacyPresented);
                }
                Err(e) => self.fail_load(e),
            }
            return Ok(());
        }

        let document = match self.source.load_input(input) {
            Ok(document) => document,
            Err(e) => {
                self.fail_load(e);
                return Ok(());
            }
        };

        if let Err(e) = self.config.check_against(document.page_count()) {
            let _ = self.state.apply(Command::LoadFailed);
            return Err(e);
        }

        self.service = Some(RenderService::with_config(
            &document,
            self.settings.workers,
            self.settings.cache_size,
        ));
        self.document = Some(document);
        self.pending_target = self.config.scroll_target;

        let effects = self.state.apply(Command::Loaded);
        self.run(effects)
    }

    fn fail_load(&mut self, e: DocumentLoadError) {
        error!("Failed to load document: {e}");
        self.load_error = Some(e);
        let _ = self.state.apply(Command::LoadFailed);
    }

    fn relayout(&mut self) -> Result<(), ConfigError> {
        let Some(document) = &self.document else {
            return Ok(());
        };
        let generation = self.state.generation;
        let layout = compute_layout(document.info(), &self.config, self.state.container)?;
        if let Some(service) = &mut self.service {
            service.begin_generation(generation);
        }

        // Surfaces whose output would be identical are only repositioned
        let boost = self.config.resolution_boost;
        let render_text = self.config.render_text;
        let before = self.pages.len();
        self.pages.retain(|&page, surface| {
            layout.page(page).is_some_and(|p| {
                p.render
                    && surface
                        .params
                        .same_output(&RenderParams::for_page(p, boost, render_text))
            })
        });
        debug!(
            "Generation {}: {} pages, kept {} of {} surfaces",
            generation.0,
            layout.pages.len(),
            self.pages.len(),
            before
        );

        self.overlay.project(
            &self.config.annotations,
            &layout.pages,
            self.config.annotation_outline_size,
        );
        self.state.scroll_top = self.state.scroll_top.min(layout.max_scroll_top());
        self.layout = Some(layout);
        Ok(())
    }

    fn apply_scroll_target(&mut self) {
        let Some(target) = self.pending_target.take() else {
            return;
        };
        let Some(layout) = &self.layout else {
            return;
        };
        let top = match target {
            ScrollTarget::Page(page) => layout.page(page).map(|p| p.top),
            ScrollTarget::Annotation(n) => self
                .overlay
                .box_for(n.saturating_sub(1))
                .map(|b| b.rect.y),
        };
        match top {
            Some(wanted) => {
                let top = wanted.clamp(0.0, layout.max_scroll_top());
                if top < wanted {
                    debug!("Scroll target {target:?} at {wanted} clamped to {top}");
                } else {
                    debug!("Scrolled to {target:?} at {top}");
                }
                self.state.scroll_top = top;
            }
            None => warn!("Scroll target {target:?} is not on any page"),
        }
    }

    fn render_visible(&mut self) {
        let (Some(layout), Some(service)) = (&self.layout, &mut self.service) else {
            return;
        };
        let margin = self.settings.prefetch_margin;
        let top = self.state.scroll_top;
        let bottom = top + layout.visible_height;
        let boost = self.config.resolution_boost;
        let render_text = self.config.render_text;

        let mut queued = 0;
        for page in layout.pages_in_band(top - margin, bottom + margin) {
            let Some(page_layout) = layout.page(page) else {
                continue;
            };
            if !page_layout.render {
                continue;
            }
            let params = RenderParams::for_page(page_layout, boost, render_text);
            if self
                .pages
                .get(&page)
                .is_some_and(|s| s.params.same_output(&params))
            {
                continue;
            }
            if let Some(cached) = service.cached_page(page, &params) {
                debug!("Page {page} served from cache");
                self.pages.insert(
                    page,
                    PageSurface {
                        params,
                        content: SurfaceContent::Painted(cached),
                    },
                );
                continue;
            }
            if service.request_page(page, params).is_some() {
                queued += 1;
            }
        }

        if queued > 0 {
            debug!("Queued {queued} page renders");
        }
        let _ = self.state.apply(Command::RendersQueued(queued));
    }

    fn apply_responses(&mut self, responses: Vec<RenderResponse>) -> usize {
        let mut painted = 0;
        for response in responses {
            match response {
                RenderResponse::Page {
                    generation,
                    page,
                    params,
                    data,
                    ..
                } => {
                    if self.accepts(generation, page, &params) {
                        self.pages.insert(
                            page,
                            PageSurface {
                                params,
                                content: SurfaceContent::Painted(data),
                            },
                        );
                        painted += 1;
                    }
                }
                RenderResponse::Failed {
                    generation,
                    page,
                    params,
                    error,
                    ..
                } => {
                    if self.accepts(generation, page, &params) {
                        warn!("Page {page} left blank: {error}");
                        self.pages.insert(
                            page,
                            PageSurface {
                                params,
                                content: SurfaceContent::Failed,
                            },
                        );
                    }
                }
                RenderResponse::Cancelled { .. } => {}
            }
        }

        if self.service.as_ref().is_some_and(|s| !s.has_pending()) {
            let _ = self.state.apply(Command::RendersSettled);
        }
        painted
    }

    /// A result is only installed if it belongs to the current layout
    fn accepts(&self, generation: Generation, page: usize, params: &RenderParams) -> bool {
        if generation != self.state.generation {
            debug!(
                "Discarding page {page} from generation {} (current {})",
                generation.0, self.state.generation.0
            );
            return false;
        }
        let boost = self.config.resolution_boost;
        let render_text = self.config.render_text;
        self.layout
            .as_ref()
            .and_then(|l| l.page(page))
            .is_some_and(|p| {
                p.render && RenderParams::for_page(p, boost, render_text).same_output(params)
            })
    }

    fn teardown(&mut self) {
        info!("Unmounting viewer");
        self.service = None;
        self.document = None;
        self.legacy_bytes = None;
        self.layout = None;
        self.pages.clear();
        self.pending_input = None;
        self.pending_target = None;
        self.resize.clear();
        self.overlay.clear();
        self.reporter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PageSize;
    use crate::test_utils::FakeBackend;

    fn settings() -> EngineSettings {
        EngineSettings {
            workers: 2,
            resize_debounce_ms: 100,
            ..EngineSettings::default()
        }
    }

    fn mounted(
        backend: FakeBackend,
        json: &str,
        container: ContainerSize,
    ) -> ViewportController<FakeBackend> {
        let mut viewer = ViewportController::new(backend, settings());
        let config = ViewerConfig::from_json(json).unwrap();
        viewer
            .mount(config, InputSource::Bytes(FakeBackend::pdf_bytes()), container)
            .unwrap();
        assert!(viewer.wait_until_idle(Duration::from_secs(5)));
        viewer
    }

    #[test]
    fn mount_paints_every_page() {
        let viewer = mounted(FakeBackend::letter(3), "{}", ContainerSize::new(612.0, 0.0));
        assert_eq!(viewer.phase(), Phase::Idle);
        for page in 1..=3 {
            let rendered = viewer.rendered_page(page).unwrap();
            assert_eq!(rendered.bitmap.width_px, 612);
            assert_eq!(rendered.bitmap.height_px, 792);
        }
    }

    #[test]
    fn load_failure_leaves_viewer_empty() {
        let mut viewer = ViewportController::new(FakeBackend::letter(2), settings());
        viewer
            .mount(
                ViewerConfig::default(),
                InputSource::Bytes(b"not a pdf".to_vec()),
                ContainerSize::new(600.0, 400.0),
            )
            .unwrap();
        assert_eq!(viewer.phase(), Phase::Unmounted);
        assert!(viewer.load_error().is_some());
        assert!(matches!(viewer.surface(), Surface::Empty));
    }

    #[test]
    fn document_dependent_errors_surface_from_mount() {
        let mut viewer = ViewportController::new(FakeBackend::letter(2), settings());
        let config = ViewerConfig::from_json(r#"{"pagesToRender": [1, 5]}"#).unwrap();
        let err = viewer
            .mount(
                config,
                InputSource::Bytes(FakeBackend::pdf_bytes()),
                ContainerSize::new(600.0, 400.0),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::PageOutOfRange {
                page: 5,
                page_count: 2
            }
        );
        assert_eq!(viewer.phase(), Phase::Unmounted);
    }

    #[test]
    fn resize_is_debounced() {
        let mut viewer = mounted(FakeBackend::letter(2), "{}", ContainerSize::new(600.0, 0.0));
        let generation = viewer.generation();
        let start = Instant::now();

        viewer.resize(ContainerSize::new(500.0, 0.0), start);
        viewer.resize(ContainerSize::new(400.0, 0.0), start + Duration::from_millis(50));
        assert_eq!(
            viewer.resize_deadline(),
            Some(start + Duration::from_millis(150))
        );
        viewer.tick(start + Duration::from_millis(120)).unwrap();
        assert_eq!(viewer.generation(), generation);

        viewer.tick(start + Duration::from_millis(200)).unwrap();
        assert_eq!(viewer.generation(), generation.next());
        assert_eq!(viewer.resize_deadline(), None);
        assert_eq!(viewer.layout().unwrap().viewer_width, 400.0);
    }

    #[test]
    fn zoom_keeps_top_page() {
        let mut viewer = mounted(
            FakeBackend::letter(5),
            r#"{"height": 500, "zoomLevel": 1.0, "showPageSeparator": false, "pagesVerticalSpacing": 0}"#,
            ContainerSize::new(612.0, 500.0),
        );
        viewer.scroll_to(792.0 * 2.0 + 10.0);
        viewer.zoom_in().unwrap();

        let layout = viewer.layout().unwrap();
        assert!((layout.pages[0].scale - 1.1).abs() < 1e-5);
        assert_eq!(viewer.scroll_top(), layout.page(3).unwrap().top);
    }

    #[test]
    fn zoom_controls_clamp_and_validate() {
        let mut viewer = mounted(
            FakeBackend::with_sizes(vec![PageSize::new(20.0, 20.0)]),
            r#"{"zoomLevel": 9.5}"#,
            ContainerSize::new(600.0, 0.0),
        );
        viewer.zoom_in().unwrap();
        assert_eq!(viewer.config().zoom, ZoomMode::Factor(Zoom::MAX_SCALE));

        viewer.zoom_preset(1).unwrap();
        assert_eq!(viewer.config().zoom, ZoomMode::Factor(0.75));
        assert!(viewer.zoom_preset(99).is_err());

        viewer.set_manual_zoom("150%").unwrap();
        assert_eq!(viewer.config().zoom, ZoomMode::Factor(1.5));
        assert!(viewer.set_manual_zoom("20").is_err());

        // No fixed height configured
        assert_eq!(viewer.fit_height(), Err(ConfigError::FitHeightWithoutHeight));
        viewer.fit_width().unwrap();
        assert_eq!(viewer.config().zoom, ZoomMode::FitWidth);
    }

    #[test]
    fn click_outside_boxes_is_ignored() {
        let mut viewer = mounted(
            FakeBackend::letter(1),
            r#"{"zoomLevel": 1, "annotations": [{"page": 1, "x": 10, "y": 10, "width": 20, "height": 20, "color": "red"}]}"#,
            ContainerSize::new(612.0, 0.0),
        );
        let events = viewer.subscribe();
        assert!(viewer.click(500.0, 500.0).is_none());
        assert!(events.try_recv().is_err());
        assert!(viewer.result().clicked_annotation.is_none());
    }

    #[test]
    fn click_events_can_be_disabled() {
        let mut viewer = mounted(
            FakeBackend::letter(1),
            r#"{"zoomLevel": 1, "onAnnotationClick": false, "annotations": [{"page": 1, "x": 10, "y": 10, "width": 20, "height": 20, "color": "red"}]}"#,
            ContainerSize::new(612.0, 0.0),
        );
        let events = viewer.subscribe();
        assert!(viewer.click(15.0, 15.0).is_some());
        assert!(events.try_recv().is_err());
        assert!(viewer.result().clicked_annotation.is_some());
    }

    #[test]
    fn unmount_releases_everything() {
        let mut viewer = mounted(FakeBackend::letter(2), "{}", ContainerSize::new(600.0, 0.0));
        viewer.unmount();
        assert_eq!(viewer.phase(), Phase::Unmounted);
        assert!(viewer.layout().is_none());
        assert!(viewer.rendered_page(1).is_none());
        assert!(matches!(viewer.surface(), Surface::Empty));
        assert_eq!(viewer.result(), InteractionResult::default());
    }
}
