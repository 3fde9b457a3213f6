//! The egui projection of a tagging session. All state lives in
//! [`TagSession`]; this module only draws it and forwards input, so every
//! frame renders whatever the session says is true.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use eframe::egui;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Stroke, Vec2};
use tracing::{error, info};

use crate::api::{ApiError, TagApi};
use crate::context::{PageContext, Person};
use crate::session::TagSession;
use crate::tags::TagId;
use crate::worker::{self, ApiEvent};

const MARKER_RADIUS: f32 = 9.0;
const MARKER_FILL: Color32 = Color32::from_rgb(46, 134, 222);
const DELETE_FILL: Color32 = Color32::from_rgb(201, 62, 62);
const PRIMARY: Color32 = Color32::from_rgb(45, 108, 223);
const DANGER: Color32 = Color32::from_rgb(186, 52, 52);

const SAVE_FAILED: &str = "Could not save the tag.";

fn delete_alert(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { message } => format!(
            "Could not remove the tag: {}",
            message.as_deref().unwrap_or("unknown error")
        ),
        _ => "Could not remove the tag.".to_owned(),
    }
}

pub struct PhotoTagApp {
    session: TagSession,
    api: Arc<TagApi>,
    caption: Option<String>,
    photo: egui::TextureHandle,
    photo_size: Vec2,
    events: Receiver<ApiEvent>,
    event_tx: Sender<ApiEvent>,
    confirm_delete: Option<TagId>,
    alert: Option<String>,
    focus_search: bool,
}

impl PhotoTagApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        context: PageContext,
        photo: image::RgbaImage,
        api: TagApi,
    ) -> Self {
        let width = photo.width();
        let height = photo.height();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [width as usize, height as usize],
            photo.as_flat_samples().as_slice(),
        );
        let texture = cc
            .egui_ctx
            .load_texture("photo", color_image, Default::default());
        let (event_tx, events) = mpsc::channel();
        Self {
            session: TagSession::new(context.photo_id, context.users, context.tags),
            api: Arc::new(api),
            caption: context.caption,
            photo: texture,
            photo_size: Vec2::new(width as f32, height as f32),
            events,
            event_tx,
            confirm_delete: None,
            alert: None,
            focus_search: false,
        }
    }

    fn apply_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Saved(Ok(tag_id)) => {
                if let Some(tag) = self.session.save_succeeded(tag_id) {
                    info!(tag_id, user = %tag.user_name, "tag saved");
                }
            }
            ApiEvent::Saved(Err(err)) => {
                self.session.mutation_failed();
                error!("saving tag failed: {err}");
                self.alert = Some(SAVE_FAILED.to_owned());
            }
            ApiEvent::Deleted {
                tag_id,
                result: Ok(()),
            } => {
                if self.session.delete_succeeded(tag_id) {
                    info!(tag_id, "tag removed");
                }
            }
            ApiEvent::Deleted {
                result: Err(err), ..
            } => {
                self.session.mutation_failed();
                error!("removing tag failed: {err}");
                self.alert = Some(delete_alert(&err));
            }
        }
    }

    fn start_save(&mut self, person: &Person, ctx: &egui::Context) {
        let Some(request) = self.session.begin_save(person) else {
            return;
        };
        worker::spawn_save(
            Arc::clone(&self.api),
            self.session.photo_id(),
            request,
            self.event_tx.clone(),
            ctx.clone(),
        );
    }

    fn start_delete(&mut self, tag_id: TagId, ctx: &egui::Context) {
        if !self.session.begin_delete(tag_id) {
            return;
        }
        worker::spawn_delete(
            Arc::clone(&self.api),
            self.session.photo_id(),
            tag_id,
            self.event_tx.clone(),
            ctx.clone(),
        );
    }

    fn ui_to_image(&self, ui_pos: Pos2, image_rect: Rect) -> Pos2 {
        let normalized = (ui_pos - image_rect.min) / image_rect.size();
        Pos2::new(
            normalized.x * self.photo_size.x,
            normalized.y * self.photo_size.y,
        )
    }

    fn image_to_ui(&self, img_pos: Pos2, image_rect: Rect) -> Pos2 {
        let normalized = Vec2::new(img_pos.x / self.photo_size.x, img_pos.y / self.photo_size.y);
        image_rect.min + normalized * image_rect.size()
    }

    fn draw_marker(painter: &Painter, center: Pos2, alpha: u8) {
        let fill = Color32::from_rgba_unmultiplied(
            MARKER_FILL.r(),
            MARKER_FILL.g(),
            MARKER_FILL.b(),
            alpha,
        );
        let ring = Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
        painter.circle_filled(center, MARKER_RADIUS, fill);
        painter.circle_stroke(center, MARKER_RADIUS, Stroke::new(2.0, ring));
    }

    fn photo_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let available_size = ui.available_size();
        let scale = (available_size.x / self.photo_size.x)
            .min(available_size.y / self.photo_size.y)
            .min(1.0);
        let display_size = self.photo_size * scale;
        let (rect, response) = ui.allocate_at_least(display_size, Sense::click());
        let image_rect = Rect::from_min_size(rect.min, display_size);

        let mut mesh = egui::Mesh::with_texture(self.photo.id());
        mesh.add_rect_with_uv(
            image_rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
        ui.painter().add(egui::Shape::mesh(mesh));

        let response = if self.session.is_tagging() {
            response.on_hover_cursor(egui::CursorIcon::Crosshair)
        } else {
            response
        };

        let painter = ui.painter_at(image_rect);
        let busy = self.session.is_busy();
        let mut remove_request = None;
        let mut profile_click = None;
        for tag in self.session.tags() {
            let Some(center_img) = tag.marker_pos() else {
                continue;
            };
            let center = self.image_to_ui(center_img, image_rect);
            let marker_rect = Rect::from_center_size(center, Vec2::splat(MARKER_RADIUS * 2.0));
            let marker = ui
                .interact(
                    marker_rect,
                    egui::Id::new(("tag-marker", tag.id)),
                    Sense::click(),
                )
                .on_hover_text(&tag.user_name);
            let delete_rect = Rect::from_center_size(marker_rect.right_top(), Vec2::splat(12.0));
            let delete = ui.interact(
                delete_rect,
                egui::Id::new(("tag-delete", tag.id)),
                Sense::click(),
            );

            Self::draw_marker(&painter, center, 255);
            painter.circle_filled(delete_rect.center(), 5.0, DELETE_FILL);
            painter.text(
                delete_rect.center(),
                Align2::CENTER_CENTER,
                "×",
                FontId::proportional(10.0),
                Color32::WHITE,
            );

            if delete.clicked() && !busy {
                remove_request = Some(tag.id);
            } else if marker.clicked() {
                profile_click = Some(tag.user_id);
            }
        }

        if let Some(point) = self.session.pending_point() {
            let center = self.image_to_ui(point, image_rect);
            Self::draw_marker(&painter, center, 128);
        }

        if let Some(tag_id) = remove_request {
            self.confirm_delete = Some(tag_id);
        }
        if let Some(user_id) = profile_click {
            ctx.open_url(egui::OpenUrl::new_tab(self.api.profile_url(user_id)));
        }

        if response.clicked() && !self.session.is_busy() {
            if let Some(pos_ui) = response.interact_pointer_pos() {
                let point = self.ui_to_image(pos_ui, image_rect);
                if self.session.click_photo(point) {
                    self.focus_search = true;
                }
            }
        }
    }

    fn tag_list_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tagged people");
        ui.separator();
        if self.session.tag_count() == 0 {
            ui.weak("No tags yet");
            return;
        }
        let busy = self.session.is_busy();
        let mut remove_request = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            for tag in self.session.tags() {
                ui.horizontal(|ui| {
                    ui.hyperlink_to(&tag.user_name, self.api.profile_url(tag.user_id));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.add_enabled(!busy, egui::Button::new("🗑")).clicked() {
                            remove_request = Some(tag.id);
                        }
                    });
                });
            }
        });
        if let Some(tag_id) = remove_request {
            self.confirm_delete = Some(tag_id);
        }
    }

    fn person_dialog(&mut self, ctx: &egui::Context) {
        let mut cancelled = false;
        let mut chosen: Option<Person> = None;
        egui::Window::new("Who is this?")
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.session.search)
                        .hint_text("Search people"),
                );
                if self.focus_search {
                    search.request_focus();
                    self.focus_search = false;
                }
                ui.separator();
                let busy = self.session.saving();
                let matches: Vec<Person> = self.session.visible_people().cloned().collect();
                egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                    if matches.is_empty() {
                        ui.weak("Nobody matches");
                    }
                    ui.add_enabled_ui(!busy, |ui| {
                        for person in matches {
                            if ui.selectable_label(false, &person.name).clicked() {
                                chosen = Some(person);
                            }
                        }
                    });
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if busy {
                        ui.spinner();
                        ui.label("Saving…");
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Cancel").clicked() {
                            cancelled = true;
                        }
                    });
                });
            });
        if let Some(person) = chosen {
            self.start_save(&person, ctx);
        } else if cancelled {
            self.session.cancel_picking();
        }
    }

    fn confirm_dialog(&mut self, ctx: &egui::Context) {
        let Some(tag_id) = self.confirm_delete else {
            return;
        };
        let name = self.session.tag(tag_id).map(|tag| tag.user_name.clone());
        let mut decision = None;
        egui::Window::new("Remove tag")
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                match &name {
                    Some(name) => ui.label(format!("Remove the tag for {name}?")),
                    None => ui.label("Remove this tag?"),
                };
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Remove").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });
        match decision {
            Some(true) => {
                self.confirm_delete = None;
                self.start_delete(tag_id, ctx);
            }
            Some(false) => self.confirm_delete = None,
            None => {}
        }
    }

    fn alert_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };
        egui::Window::new("Something went wrong")
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    self.alert = None;
                }
            });
    }
}

impl eframe::App for PhotoTagApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event);
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.alert.is_some() {
                self.alert = None;
            } else if self.confirm_delete.is_some() {
                self.confirm_delete = None;
            } else if self.session.dialog_open() {
                self.session.cancel_picking();
            }
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(self.caption.as_deref().unwrap_or("Photo"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let (label, fill) = if self.session.is_tagging() {
                        ("✖ Cancel", DANGER)
                    } else {
                        ("🏷 Start tagging", PRIMARY)
                    };
                    let button =
                        egui::Button::new(egui::RichText::new(label).color(Color32::WHITE))
                            .fill(fill);
                    if ui.add(button).clicked() {
                        self.session.toggle_tagging();
                    }
                });
            });
        });

        egui::SidePanel::right("tags_panel")
            .default_width(220.0)
            .show(ctx, |ui| {
                self.tag_list_ui(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.photo_ui(ui, ctx);
        });

        if self.session.dialog_open() {
            self.person_dialog(ctx);
        }
        self.confirm_dialog(ctx);
        self.alert_dialog(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_alert_includes_the_server_reason() {
        let err = ApiError::Rejected {
            message: Some("Permission denied".to_owned()),
        };
        assert_eq!(
            delete_alert(&err),
            "Could not remove the tag: Permission denied"
        );
    }

    #[test]
    fn delete_alert_falls_back_when_no_reason_is_given() {
        let err = ApiError::Rejected { message: None };
        assert_eq!(delete_alert(&err), "Could not remove the tag: unknown error");
    }

    #[test]
    fn delete_alert_stays_generic_for_transport_errors() {
        let err = ApiError::Network("connection refused".to_owned());
        assert_eq!(delete_alert(&err), "Could not remove the tag.");
    }
}
