//! Background threads for the tagging requests, so a slow server never
//! blocks a frame. Completions come back over a channel the app drains at
//! the top of each update.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use eframe::egui;

use crate::api::{ApiError, TagApi};
use crate::session::SaveRequest;
use crate::tags::{PhotoId, TagId};

#[derive(Debug)]
pub enum ApiEvent {
    Saved(Result<TagId, ApiError>),
    Deleted {
        tag_id: TagId,
        result: Result<(), ApiError>,
    },
}

pub fn spawn_save(
    api: Arc<TagApi>,
    photo_id: PhotoId,
    request: SaveRequest,
    events: Sender<ApiEvent>,
    ctx: egui::Context,
) {
    thread::spawn(move || {
        let result = api.create_tag(photo_id, &request);
        // The app may have shut down already; a dead channel is fine.
        let _ = events.send(ApiEvent::Saved(result));
        ctx.request_repaint();
    });
}

pub fn spawn_delete(
    api: Arc<TagApi>,
    photo_id: PhotoId,
    tag_id: TagId,
    events: Sender<ApiEvent>,
    ctx: egui::Context,
) {
    thread::spawn(move || {
        let result = api.delete_tag(photo_id, tag_id);
        let _ = events.send(ApiEvent::Deleted { tag_id, result });
        ctx.request_repaint();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn spawn_save_delivers_a_saved_event() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/photos/42/tag")
            .with_status(200)
            .with_body(r#"{"success": true, "tag_id": 9}"#)
            .create();

        let api = Arc::new(TagApi::new(&server.url(), "tok").unwrap());
        let (tx, rx) = mpsc::channel();
        let request = SaveRequest {
            user_id: 3,
            shape: "rect".to_owned(),
            coords: "90,90,110,110".to_owned(),
        };
        spawn_save(api, 42, request, tx, egui::Context::default());

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ApiEvent::Saved(Ok(tag_id)) => assert_eq!(tag_id, 9),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn spawn_delete_reports_the_tag_it_worked_on() {
        let mut server = mockito::Server::new();
        server
            .mock("DELETE", "/photos/42/tag/9")
            .with_status(403)
            .with_body(r#"{"success": false, "message": "Permission denied"}"#)
            .create();

        let api = Arc::new(TagApi::new(&server.url(), "tok").unwrap());
        let (tx, rx) = mpsc::channel();
        spawn_delete(api, 42, 9, tx, egui::Context::default());

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ApiEvent::Deleted { tag_id, result } => {
                assert_eq!(tag_id, 9);
                assert!(matches!(result, Err(ApiError::Rejected { .. })));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
