use std::sync::Arc;

use crate::annotation::annotation_store::AnnotationStore;
use crate::annotation::domain::coordinate_mapper::CoordinateMapper;
use crate::editor::domain::editor_mode::{Draft, EditorMode};
use crate::editor::domain::render_surface::{
    RenderSurface, SurfaceLayout, DETECTED_FACE, DRAFT_FILL, DRAFT_STROKE, FACE_CENTER,
    FRAME_BORDER, MANUAL_FACE,
};
use crate::pipeline::error::{PipelineError, ValidationError};
use crate::remote::domain::video_service::VideoService;
use crate::shared::constants::MIN_DRAW_SIZE;
use crate::shared::frame_image::FrameImage;
use crate::shared::geometry::{DisplayPoint, DisplayRect, SourceRect};
use crate::shared::region::FaceRegion;

const BORDER_WIDTH: f64 = 2.0;
const REGION_LINE_WIDTH: f64 = 2.0;
const LABEL_OFFSET: f64 = 5.0;
const CENTER_MARKER: f64 = 4.0;

/// Result of releasing the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DrawOutcome {
    /// A face was submitted and accepted, in source pixels.
    Added(SourceRect),
    /// The drag was too small to be a face.
    Discarded,
    /// Not drawing.
    Ignored,
}

/// One row of the per-frame face list.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceListEntry {
    pub index: usize,
    pub label: String,
    pub region: FaceRegion,
}

/// Which editor actions are currently available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditorControls {
    pub previous_frame: bool,
    pub next_frame: bool,
    pub add_mode: bool,
    pub remove_mode: bool,
    pub clear_frame: bool,
    pub finish: bool,
}

/// Interactive editing of face regions, one frame at a time.
///
/// The editor keeps the decoded image of the current frame so overlays can
/// be repainted on every pointer move without a request. The image is
/// fetched again whenever the frame changes or a change to its regions has
/// been confirmed.
pub struct RegionEditor {
    service: Arc<dyn VideoService>,
    store: Arc<AnnotationStore>,
    session_id: String,
    mapper: CoordinateMapper,
    total_frames: u32,
    current_frame: u32,
    mode: EditorMode,
    base: Option<FrameImage>,
}

impl RegionEditor {
    pub fn new(
        service: Arc<dyn VideoService>,
        store: Arc<AnnotationStore>,
        session_id: impl Into<String>,
        mapper: CoordinateMapper,
        total_frames: u32,
    ) -> Self {
        Self {
            service,
            store,
            session_id: session_id.into(),
            mapper,
            total_frames,
            current_frame: 0,
            mode: EditorMode::Idle,
            base: None,
        }
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    fn last_frame(&self) -> u32 {
        self.total_frames.saturating_sub(1)
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn mapper(&self) -> CoordinateMapper {
        self.mapper
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Fetches the current frame's image and paints it with its regions.
    pub async fn load_frame(&mut self, surface: &mut dyn RenderSurface) -> Result<(), PipelineError> {
        let bytes = self
            .service
            .frame_image(&self.session_id, self.current_frame)
            .await?;
        self.base = Some(FrameImage::decode(&bytes, self.current_frame)?);
        self.render(surface);
        Ok(())
    }

    /// Returns whether the frame changed.
    pub async fn previous_frame(&mut self, surface: &mut dyn RenderSurface) -> Result<bool, PipelineError> {
        if self.current_frame == 0 {
            return Ok(false);
        }
        self.show_frame(self.current_frame - 1, surface).await?;
        Ok(true)
    }

    /// Returns whether the frame changed.
    pub async fn next_frame(&mut self, surface: &mut dyn RenderSurface) -> Result<bool, PipelineError> {
        if self.current_frame >= self.last_frame() {
            return Ok(false);
        }
        self.show_frame(self.current_frame + 1, surface).await?;
        Ok(true)
    }

    pub async fn go_to_frame(
        &mut self,
        frame: u32,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), PipelineError> {
        if frame > self.last_frame() {
            return Err(ValidationError::FrameOutOfRange {
                frame,
                last: self.last_frame(),
            }
            .into());
        }
        self.show_frame(frame, surface).await
    }

    async fn show_frame(&mut self, frame: u32, surface: &mut dyn RenderSurface) -> Result<(), PipelineError> {
        // The draft belongs to the frame it was started on.
        if let EditorMode::Adding { draft } = &mut self.mode {
            *draft = None;
        }
        self.current_frame = frame;
        self.base = None;
        self.load_frame(surface).await
    }

    pub fn toggle_add_mode(&mut self, surface: &mut dyn RenderSurface) {
        let had_draft = self.mode.draft().is_some();
        self.mode = self.mode.toggle_add();
        if had_draft {
            self.render(surface);
        }
    }

    pub fn toggle_remove_mode(&mut self, surface: &mut dyn RenderSurface) {
        let had_draft = self.mode.draft().is_some();
        self.mode = self.mode.toggle_remove();
        if had_draft {
            self.render(surface);
        }
    }

    pub fn pointer_down(&mut self, layout: &SurfaceLayout, at: DisplayPoint) {
        if let EditorMode::Adding { draft } = &mut self.mode {
            *draft = Some(Draft::at(layout.to_canvas(at)));
        }
    }

    pub fn pointer_move(&mut self, layout: &SurfaceLayout, at: DisplayPoint, surface: &mut dyn RenderSurface) {
        if let EditorMode::Adding { draft: Some(draft) } = &mut self.mode {
            draft.current = layout.to_canvas(at);
            self.render(surface);
        }
    }

    /// Finishes a drag. A large enough rectangle is submitted as a manual
    /// face; anything under the minimum size is dropped without a request.
    pub async fn pointer_up(
        &mut self,
        layout: &SurfaceLayout,
        at: DisplayPoint,
        surface: &mut dyn RenderSurface,
    ) -> Result<DrawOutcome, PipelineError> {
        let EditorMode::Adding { draft } = &mut self.mode else {
            return Ok(DrawOutcome::Ignored);
        };
        let Some(mut finished) = draft.take() else {
            return Ok(DrawOutcome::Ignored);
        };
        finished.current = layout.to_canvas(at);

        let rect = finished.rect();
        if rect.width < MIN_DRAW_SIZE || rect.height < MIN_DRAW_SIZE {
            log::debug!("Discarding {:.0}x{:.0} draft", rect.width, rect.height);
            self.render(surface);
            return Ok(DrawOutcome::Discarded);
        }

        let source = self.mapper.to_source(rect);
        if let Err(e) = self.store.add_region(self.current_frame, source).await {
            self.render(surface);
            return Err(e.into());
        }
        log::info!(
            "Added face on frame {} at {:?}",
            self.current_frame,
            source.rounded()
        );
        self.load_frame(surface).await?;
        Ok(DrawOutcome::Added(source))
    }

    /// In remove mode, removes the topmost face under the pointer.
    ///
    /// The frame's regions are re-read first so the index sent to the
    /// service is the one it currently holds. Returns the removed index.
    pub async fn pointer_click(
        &mut self,
        layout: &SurfaceLayout,
        at: DisplayPoint,
        surface: &mut dyn RenderSurface,
    ) -> Result<Option<usize>, PipelineError> {
        if !self.mode.is_removing() {
            return Ok(None);
        }
        let point = layout.to_canvas(at);

        self.store.refresh().await?;
        let Some(index) = self.hit_test(point) else {
            self.render(surface);
            return Ok(None);
        };

        self.store.remove_region(self.current_frame, index).await?;
        log::info!("Removed face #{index} from frame {}", self.current_frame);
        self.load_frame(surface).await?;
        Ok(Some(index))
    }

    /// Index of the last-drawn region containing `point`.
    fn hit_test(&self, point: DisplayPoint) -> Option<usize> {
        self.store
            .get(self.current_frame)
            .iter()
            .enumerate()
            .rev()
            .find(|(_, region)| self.mapper.to_display(region.source_rect()).contains(point))
            .map(|(i, _)| i)
    }

    /// Removes a face picked from the [`face_list`](Self::face_list).
    pub async fn remove_face(&mut self, index: usize, surface: &mut dyn RenderSurface) -> Result<(), PipelineError> {
        self.store.remove_region(self.current_frame, index).await?;
        log::info!("Removed face #{index} from frame {}", self.current_frame);
        self.load_frame(surface).await
    }

    /// Returns the number of faces cleared.
    pub async fn clear_current_frame(&mut self, surface: &mut dyn RenderSurface) -> Result<usize, PipelineError> {
        let cleared = self.store.clear_frame(self.current_frame).await?;
        if cleared > 0 {
            log::info!("Cleared {cleared} faces from frame {}", self.current_frame);
            self.load_frame(surface).await?;
        }
        Ok(cleared)
    }

    pub fn face_list(&self) -> Vec<FaceListEntry> {
        self.store
            .get(self.current_frame)
            .into_iter()
            .enumerate()
            .map(|(index, region)| FaceListEntry {
                index,
                label: region.label(index),
                region,
            })
            .collect()
    }

    pub fn controls(&self) -> EditorControls {
        if self.store.is_busy() {
            return EditorControls::default();
        }
        EditorControls {
            previous_frame: self.current_frame > 0,
            next_frame: self.current_frame < self.last_frame(),
            add_mode: true,
            remove_mode: true,
            clear_frame: !self.store.get(self.current_frame).is_empty(),
            finish: true,
        }
    }

    /// Repaints frame, border, regions and the draft preview from cache.
    pub fn render(&self, surface: &mut dyn RenderSurface) {
        surface.clear();
        if let Some(frame) = &self.base {
            surface.draw_frame(frame);
        }

        let (width, height) = self.mapper.display_size();
        surface.stroke_rect(DisplayRect::new(0.0, 0.0, width, height), FRAME_BORDER, BORDER_WIDTH);

        for (index, region) in self.store.get(self.current_frame).iter().enumerate() {
            let rect = self.mapper.to_display(region.source_rect());
            let color = if region.manual { MANUAL_FACE } else { DETECTED_FACE };
            surface.stroke_rect(rect, color, REGION_LINE_WIDTH);
            surface.fill_text(
                &region.label(index),
                DisplayPoint::new(rect.x, rect.y - LABEL_OFFSET),
                color,
            );
            let c = rect.center();
            let half = CENTER_MARKER / 2.0;
            surface.fill_rect(
                DisplayRect::new(c.x - half, c.y - half, CENTER_MARKER, CENTER_MARKER),
                FACE_CENTER,
            );
        }

        if let Some(draft) = self.mode.draft() {
            let rect = draft.rect();
            surface.fill_rect(rect, DRAFT_FILL);
            surface.stroke_rect(rect, DRAFT_STROKE, REGION_LINE_WIDTH);
        }
    }
}
