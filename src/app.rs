use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};
use eframe::{egui, App, CreationContext, Frame};
use egui::{Align2, Color32, ColorImage, Key, Modifiers, Rect, Sense, TextureHandle, TextureOptions, Ui};
use image::DynamicImage;
use log::{info, warn};

use crate::archive::ArchiveFailure;
use crate::config::Config;
use crate::file_list::{DisplayEntry, Fingerprint, SortPolicy};
use crate::ingest::{IngestJob, Ingested, Source};
use crate::position::PositionStore;
use crate::viewer::{Navigation, Viewer, ViewerState};

const HINT_SECONDS: f32 = 5.0;
const STATUS_SECONDS: f32 = 3.0;
const ERROR_SECONDS: f32 = 5.0;

/// Scroll distance, in points, that turns one page.
const WHEEL_STEP: f32 = 50.0;
/// Quiet time after which the next scroll counts as a new gesture.
const WHEEL_IDLE_SECONDS: f32 = 0.25;

const PICKER_EXTENSIONS: [&str; 9] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "zip"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WheelStep {
    Next,
    Previous,
}

/// Collapses one wheel or trackpad swipe, which arrives spread over many
/// frames, into at most one page turn.
#[derive(Debug, Default)]
struct WheelGesture {
    accumulated: f32,
    fired: bool,
    idle: f32,
}

impl WheelGesture {
    fn feed(&mut self, delta: f32, dt: f32) -> Option<WheelStep> {
        if delta == 0.0 {
            self.idle += dt;
            if self.idle >= WHEEL_IDLE_SECONDS {
                *self = Self::default();
            }
            return None;
        }

        self.idle = 0.0;
        if self.fired {
            return None;
        }
        self.accumulated += delta;
        if self.accumulated.abs() < WHEEL_STEP {
            return None;
        }
        self.fired = true;
        Some(if self.accumulated > 0.0 {
            WheelStep::Previous
        } else {
            WheelStep::Next
        })
    }
}

/// Toast shown once a list opens: any warning first, then the Tab hint.
fn ingest_status(failures: &[ArchiveFailure], ignored: usize) -> (String, f32) {
    let hint = "Press Tab to show page info";
    if !failures.is_empty() {
        let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
        (
            format!(
                "Could not read {} archive(s): {}. {hint}",
                failures.len(),
                names.join(", ")
            ),
            ERROR_SECONDS,
        )
    } else if ignored > 0 {
        (format!("Skipped {ignored} unsupported file(s). {hint}"), HINT_SECONDS)
    } else {
        (hint.to_owned(), HINT_SECONDS)
    }
}

/// Decoded page currently on the GPU.
struct Page {
    fingerprint: Fingerprint,
    index: usize,
    texture: Result<TextureHandle, String>,
}

pub struct FlipbookApp {
    viewer: Viewer,
    store: PositionStore,
    sort: SortPolicy,
    job: Option<IngestJob>,
    page: Option<Page>,
    notice: Option<&'static str>,
    status_message: Option<(String, f32)>,
    fullscreen: bool,
    drag_hover: bool,
    wheel: WheelGesture,
}

impl FlipbookApp {
    pub fn new(cc: &CreationContext<'_>, config: Config) -> Self {
        let store = match &config.state_file {
            Some(path) => PositionStore::load(path),
            None => PositionStore::in_memory(),
        };
        info!(
            "Loaded {} reading positions from {}",
            store.len(),
            store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "memory".to_owned())
        );

        let mut app = Self {
            viewer: Viewer::new(),
            store,
            sort: config.sort,
            job: None,
            page: None,
            notice: None,
            status_message: None,
            fullscreen: config.fullscreen,
            drag_hover: false,
            wheel: WheelGesture::default(),
        };

        if !config.initial_paths.is_empty() {
            app.start_ingest(Source::Drop(config.initial_paths), &cc.egui_ctx);
        }
        app
    }

    fn set_status(&mut self, message: String, duration: f32) {
        self.status_message = Some((message, duration));
    }

    fn start_ingest(&mut self, source: Source, ctx: &egui::Context) {
        self.job = Some(IngestJob::spawn(source, self.sort));
        self.set_status("Loading…".to_owned(), STATUS_SECONDS);
        ctx.request_repaint();
    }

    fn poll_ingest(&mut self, ctx: &egui::Context) {
        let Some(job) = &self.job else {
            return;
        };
        match job.poll() {
            Some(ingested) => {
                self.job = None;
                self.finish_ingest(ingested);
            }
            None => ctx.request_repaint_after(Duration::from_millis(50)),
        }
    }

    fn finish_ingest(&mut self, ingested: Ingested) {
        let Ingested { list, failures, ignored } = ingested;
        if list.is_empty() {
            self.set_status("No images found".to_owned(), ERROR_SECONDS);
            return;
        }

        self.page = None;
        self.notice = None;
        self.viewer.open(list, &mut self.store);

        let (message, duration) = ingest_status(&failures, ignored);
        self.set_status(message, duration);
    }

    fn open_files_dialog(&mut self, ctx: &egui::Context) {
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Images & Zip archives", &PICKER_EXTENSIONS)
            .pick_files()
        {
            self.start_ingest(Source::Picker(paths), ctx);
        }
    }

    fn open_folder_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            self.start_ingest(Source::Drop(vec![path]), ctx);
        }
    }

    fn go_next(&mut self) {
        let navigation = self.viewer.next(&mut self.store);
        self.after_navigation(navigation);
    }

    fn go_previous(&mut self) {
        let navigation = self.viewer.previous(&mut self.store);
        self.after_navigation(navigation);
    }

    fn after_navigation(&mut self, navigation: Navigation) {
        self.notice = match navigation {
            Navigation::ReachedEnd => Some("You've reached the last page."),
            Navigation::ReachedBeginning => Some("You're at the first page."),
            Navigation::Moved(_) | Navigation::Closed | Navigation::Ignored => None,
        };
        if navigation == Navigation::Closed {
            self.page = None;
        }
    }

    fn toggle_fullscreen(&mut self, ctx: &egui::Context) {
        self.fullscreen = !self.fullscreen;
        ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(self.fullscreen));
    }

    fn handle_drag_drop_events(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            self.drag_hover = !i.raw.hovered_files.is_empty();
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });

        if !dropped.is_empty() {
            info!("Dropped {} paths", dropped.len());
            self.start_ingest(Source::Drop(dropped), ctx);
        }
    }

    fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        if ctx.input_mut(|i| i.consume_key(Modifiers::NONE, Key::F11)) {
            self.toggle_fullscreen(ctx);
        }
        if self.viewer.list().is_none() {
            return;
        }

        let fullscreen_mods = if cfg!(target_os = "macos") {
            Modifiers::MAC_CMD
        } else {
            Modifiers::ALT
        };

        let input = ctx.input_mut(|i| {
            (
                i.consume_key(Modifiers::NONE, Key::ArrowRight)
                    | i.consume_key(Modifiers::NONE, Key::ArrowDown)
                    | i.consume_key(Modifiers::NONE, Key::Space),
                i.consume_key(Modifiers::NONE, Key::ArrowLeft) | i.consume_key(Modifiers::NONE, Key::ArrowUp),
                i.consume_key(Modifiers::NONE, Key::Tab),
                i.consume_key(Modifiers::NONE, Key::Escape),
                i.consume_key(fullscreen_mods, Key::Enter),
            )
        });

        let (next, previous, tab, escape, fullscreen_combo) = input;

        if next {
            self.go_next();
        } else if previous {
            self.go_previous();
        } else if tab {
            self.viewer.toggle_info();
        } else if escape {
            if self.fullscreen && !self.viewer.is_reading() {
                self.toggle_fullscreen(ctx);
            } else {
                self.viewer.exit();
                self.notice = None;
            }
        } else if fullscreen_combo && self.viewer.is_reading() {
            self.toggle_fullscreen(ctx);
            self.viewer.hide_info();
        }
    }

    fn current_texture(&mut self, ctx: &egui::Context) -> Option<Result<TextureHandle, String>> {
        let (index, entry) = self.viewer.current()?;
        let fingerprint = self.viewer.list()?.fingerprint().clone();

        let stale = self
            .page
            .as_ref()
            .map_or(true, |p| p.index != index || p.fingerprint != fingerprint);
        if stale {
            let texture = load_page(entry, ctx).map_err(|e| {
                warn!("{:#}", e);
                format!("{:#}", e)
            });
            self.page = Some(Page {
                fingerprint,
                index,
                texture,
            });
        }
        self.page.as_ref().map(|p| p.texture.clone())
    }
}

fn load_page(entry: &DisplayEntry, ctx: &egui::Context) -> Result<TextureHandle> {
    let bytes = entry
        .file
        .bytes()
        .with_context(|| format!("Failed to read {}", entry.display_name))?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("Failed to decode image: {}", entry.display_name))?;
    Ok(to_texture(img, ctx))
}

fn to_texture(img: DynamicImage, ctx: &egui::Context) -> TextureHandle {
    let size = [img.width() as _, img.height() as _];
    let image_buffer = img.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    let color_image = ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    ctx.load_texture("current_page", color_image, TextureOptions::default())
}

/// Largest rect with the texture's aspect ratio that fits in `bounds`.
fn contain(bounds: Rect, texture: &TextureHandle) -> Rect {
    let size = texture.size_vec2();
    if size.x <= 0.0 || size.y <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / size.x).min(bounds.height() / size.y);
    Rect::from_center_size(bounds.center(), size * scale)
}

impl App for FlipbookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_ingest(ctx);
        self.handle_drag_drop_events(ctx);
        self.handle_keyboard_input(ctx);

        if let Some((_, ref mut duration)) = self.status_message {
            *duration -= ctx.input(|i| i.unstable_dt);
            if *duration <= 0.0 {
                self.status_message = None;
            } else {
                ctx.request_repaint_after(Duration::from_millis(250));
            }
        }

        if self.viewer.is_reading() {
            egui::CentralPanel::default()
                .frame(egui::containers::Frame::new().fill(Color32::BLACK))
                .show(ctx, |ui| self.draw_reader(ui, ctx));
            if self.viewer.show_info() {
                self.draw_info_overlay(ctx);
            }
            self.draw_status_toast(ctx);
        } else {
            egui::CentralPanel::default().show(ctx, |ui| self.draw_landing(ui, ctx));
        }

        if let Some(message) = self.notice {
            egui::Window::new("Notice")
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.label(message);
                        ui.label("Go further once more to close these pages.");
                        ui.add_space(10.0);
                        if ui.button("OK").clicked() {
                            self.notice = None;
                        }
                    });
                });
        }

        if self.drag_hover {
            self.draw_drag_overlay(ctx);
        }
    }
}

impl FlipbookApp {
    fn draw_reader(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        let bounds = ui.max_rect();
        let response = ui.allocate_rect(bounds, Sense::click());

        match self.current_texture(ctx) {
            Some(Ok(texture)) => {
                ui.painter().image(
                    texture.id(),
                    contain(bounds, &texture),
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            Some(Err(message)) => {
                ui.painter().text(
                    bounds.center(),
                    Align2::CENTER_CENTER,
                    message,
                    egui::FontId::proportional(18.0),
                    Color32::LIGHT_RED,
                );
            }
            None => {}
        }

        if response.long_touched() || response.secondary_clicked() {
            self.viewer.toggle_info();
        } else if response.clicked() && !self.viewer.show_info() {
            let left_half = response
                .interact_pointer_pos()
                .is_some_and(|pos| pos.x < bounds.center().x);
            if left_half {
                self.go_previous();
            } else {
                self.go_next();
            }
        }

        // The boundary notice is only dismissed by a deliberate step.
        let (scroll, dt) = ctx.input(|i| (i.raw_scroll_delta.y, i.unstable_dt));
        let delta = if self.viewer.state() == ViewerState::ConfirmExit {
            0.0
        } else {
            scroll
        };
        match self.wheel.feed(delta, dt) {
            Some(WheelStep::Previous) => self.go_previous(),
            Some(WheelStep::Next) => self.go_next(),
            None => {}
        }
    }

    fn draw_info_overlay(&mut self, ctx: &egui::Context) {
        let Some((index, entry)) = self.viewer.current() else {
            return;
        };
        let name = entry.display_name.clone();
        let total = self.viewer.list().map_or(0, |l| l.len());

        let screen = ctx.screen_rect();
        let band = screen.height() * 0.25;
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Middle, egui::Id::new("info_shade")));
        painter.rect_filled(
            Rect::from_min_max(screen.min, egui::pos2(screen.max.x, screen.min.y + band)),
            0.0,
            Color32::from_black_alpha(190),
        );
        painter.rect_filled(
            Rect::from_min_max(egui::pos2(screen.min.x, screen.max.y - band), screen.max),
            0.0,
            Color32::from_black_alpha(190),
        );

        egui::Area::new(egui::Id::new("info_top"))
            .anchor(Align2::LEFT_TOP, egui::vec2(24.0, 16.0))
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(name).size(20.0).strong().color(Color32::WHITE));
            });

        let mut exit = false;
        let mut close = false;
        egui::Area::new(egui::Id::new("info_bottom"))
            .anchor(Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(format!("{} / {}", index + 1, total))
                            .size(18.0)
                            .color(Color32::WHITE),
                    );
                    ui.add_space(16.0);
                    exit = ui.button("Exit").clicked();
                    close = ui.button("Close").clicked();
                });
            });

        if exit {
            self.viewer.exit();
            self.notice = None;
        } else if close {
            self.viewer.toggle_info();
        }
    }

    fn draw_status_toast(&self, ctx: &egui::Context) {
        let Some((ref message, _)) = self.status_message else {
            return;
        };
        egui::Area::new(egui::Id::new("status_toast"))
            .anchor(Align2::CENTER_BOTTOM, egui::vec2(0.0, -64.0))
            .show(ctx, |ui| {
                egui::containers::Frame::new()
                    .fill(Color32::from_rgba_unmultiplied(0, 0, 0, 180))
                    .corner_radius(5.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(message).color(Color32::WHITE));
                    });
            });
    }

    fn draw_drag_overlay(&self, ctx: &egui::Context) {
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, egui::Id::new("drop_target")));
        let screen = ctx.screen_rect();
        painter.rect_filled(screen, 0.0, Color32::from_black_alpha(160));
        painter.text(
            screen.center(),
            Align2::CENTER_CENTER,
            "Drop to open",
            egui::FontId::proportional(32.0),
            Color32::WHITE,
        );
    }

    fn draw_landing(&mut self, ui: &mut Ui, ctx: &egui::Context) {
        if let Some(list) = self.viewer.list() {
            let pages = list.len();
            ui.horizontal(|ui| {
                if ui.button("← Back to reading").clicked() {
                    self.viewer.resume();
                }
                ui.label(format!("{pages} pages loaded"));
            });
            ui.separator();
        }

        ui.centered_and_justified(|ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Flipbook");
                ui.label("Drop images, folders or zip archives here");
                ui.add_space(20.0);

                if self.job.is_some() {
                    ui.spinner();
                } else {
                    ui.horizontal(|ui| {
                        if ui.button("Open Files…").clicked() {
                            self.open_files_dialog(ctx);
                        }
                        if ui.button("Open Folder…").clicked() {
                            self.open_folder_dialog(ctx);
                        }
                    });
                }

                if let Some((ref message, _)) = self.status_message {
                    ui.add_space(10.0);
                    ui.label(message);
                }

                ui.add_space(20.0);
                ui.collapsing("Keyboard Shortcuts", |ui| {
                    ui.label("Right / Down / Space: Next page");
                    ui.label("Left / Up: Previous page");
                    ui.label("Tab: Show or hide page info");
                    ui.label("Escape: Leave the reader");
                    if cfg!(target_os = "macos") {
                        ui.label("Cmd+Enter or F11: Toggle fullscreen");
                    } else {
                        ui.label("Alt+Enter or F11: Toggle fullscreen");
                    }
                    ui.label("Click left / right half: Previous / Next page");
                    ui.label("Right click or long touch: Show or hide page info");
                    ui.label("Mouse wheel: Navigate pages");
                });
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn one_swipe_over_many_frames_turns_one_page() {
        let mut wheel = WheelGesture::default();
        let steps: Vec<WheelStep> = (0..40).filter_map(|_| wheel.feed(-30.0, FRAME)).collect();
        assert_eq!(steps, [WheelStep::Next]);
    }

    #[test]
    fn pause_between_swipes_starts_a_new_gesture() {
        let mut wheel = WheelGesture::default();
        assert_eq!(wheel.feed(80.0, FRAME), Some(WheelStep::Previous));
        assert_eq!(wheel.feed(80.0, FRAME), None);

        // Short gaps inside one swipe do not reset it.
        assert_eq!(wheel.feed(0.0, FRAME), None);
        assert_eq!(wheel.feed(80.0, FRAME), None);

        for _ in 0..20 {
            assert_eq!(wheel.feed(0.0, FRAME), None);
        }
        assert_eq!(wheel.feed(-80.0, FRAME), Some(WheelStep::Next));
    }

    #[test]
    fn small_nudges_below_the_step_do_nothing() {
        let mut wheel = WheelGesture::default();
        assert_eq!(wheel.feed(-10.0, FRAME), None);
        assert_eq!(wheel.feed(-10.0, FRAME), None);
        for _ in 0..20 {
            wheel.feed(0.0, FRAME);
        }
        assert_eq!(wheel.feed(-30.0, FRAME), None);
    }

    #[test]
    fn clean_ingest_shows_only_the_hint() {
        let (message, duration) = ingest_status(&[], 0);
        assert_eq!(message, "Press Tab to show page info");
        assert_eq!(duration, HINT_SECONDS);
    }

    #[test]
    fn warnings_keep_the_hint() {
        let failures = [ArchiveFailure {
            name: "broken.zip".to_owned(),
            reason: "invalid Zip archive".to_owned(),
        }];
        let (message, duration) = ingest_status(&failures, 2);
        assert!(message.starts_with("Could not read 1 archive(s): broken.zip"));
        assert!(message.ends_with("Press Tab to show page info"));
        assert_eq!(duration, ERROR_SECONDS);

        let (message, _) = ingest_status(&[], 3);
        assert_eq!(message, "Skipped 3 unsupported file(s). Press Tab to show page info");
    }
}
