//! Controller state for one photo view. The egui layer projects this state
//! every frame and never holds tag data of its own.

use std::collections::BTreeMap;

use eframe::egui::Pos2;

use crate::context::Person;
use crate::tags::{PhotoId, Tag, TagBox, TagId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Tagging,
    PickingPerson,
}

/// A mutation the server has not answered yet. While one is set, the UI
/// disables everything that could start another.
#[derive(Debug, Clone)]
pub enum InFlight {
    Save(PendingSave),
    Delete(TagId),
}

#[derive(Debug, Clone)]
pub struct PendingSave {
    pub user_id: UserId,
    pub user_name: String,
    pub bbox: TagBox,
}

/// What the worker sends to the server for a new tag.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub user_id: UserId,
    pub shape: String,
    pub coords: String,
}

pub struct TagSession {
    photo_id: PhotoId,
    phase: Phase,
    pending_point: Option<Pos2>,
    people: Vec<Person>,
    tags: BTreeMap<TagId, Tag>,
    in_flight: Option<InFlight>,
    /// Search text of the selection dialog; bound to the text edit.
    pub search: String,
}

impl TagSession {
    pub fn new(photo_id: PhotoId, people: Vec<Person>, tags: Vec<Tag>) -> Self {
        let tags = tags.into_iter().map(|t| (t.id, t)).collect();
        Self {
            photo_id,
            phase: Phase::Idle,
            pending_point: None,
            people,
            tags,
            in_flight: None,
            search: String::new(),
        }
    }

    pub fn photo_id(&self) -> PhotoId {
        self.photo_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_tagging(&self) -> bool {
        matches!(self.phase, Phase::Tagging | Phase::PickingPerson)
    }

    pub fn dialog_open(&self) -> bool {
        self.phase == Phase::PickingPerson
    }

    pub fn pending_point(&self) -> Option<Pos2> {
        self.pending_point
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn saving(&self) -> bool {
        matches!(self.in_flight, Some(InFlight::Save(_)))
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Tags in id order; ids ascend with creation, so new entries land at
    /// the end of the list.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    /// Case-insensitive substring containment; the empty filter matches
    /// everything. No ranking.
    pub fn name_matches(filter: &str, name: &str) -> bool {
        name.to_lowercase().contains(&filter.to_lowercase())
    }

    pub fn visible_people(&self) -> impl Iterator<Item = &Person> {
        self.people
            .iter()
            .filter(|p| Self::name_matches(&self.search, &p.name))
    }

    /// Start-button click. Turning tagging off also discards the pending
    /// point, which removes the temporary marker and closes the dialog.
    pub fn toggle_tagging(&mut self) {
        self.phase = match self.phase {
            Phase::Idle => Phase::Tagging,
            Phase::Tagging | Phase::PickingPerson => {
                self.pending_point = None;
                Phase::Idle
            }
        };
    }

    /// Photo click in image coordinates. Ignored while idle. Replaces any
    /// previous pending point and opens the dialog with a cleared filter.
    /// Returns whether the click was taken.
    pub fn click_photo(&mut self, point: Pos2) -> bool {
        if self.phase == Phase::Idle {
            return false;
        }
        self.pending_point = Some(point);
        self.search.clear();
        self.phase = Phase::PickingPerson;
        true
    }

    /// Dialog dismissed without choosing anyone: the temporary marker goes
    /// away, tagging mode stays on.
    pub fn cancel_picking(&mut self) {
        if self.phase == Phase::PickingPerson {
            self.pending_point = None;
            self.phase = Phase::Tagging;
        }
    }

    /// Person chosen in the dialog. Builds the fixed-size box around the
    /// pending point and occupies the in-flight slot. `None` when there is
    /// nothing to save or a mutation is already pending.
    pub fn begin_save(&mut self, person: &Person) -> Option<SaveRequest> {
        if self.in_flight.is_some() || self.phase != Phase::PickingPerson {
            return None;
        }
        let point = self.pending_point?;
        let bbox = TagBox::around(point);
        self.in_flight = Some(InFlight::Save(PendingSave {
            user_id: person.id,
            user_name: person.name.clone(),
            bbox,
        }));
        Some(SaveRequest {
            user_id: person.id,
            shape: "rect".to_owned(),
            coords: bbox.coords_string(),
        })
    }

    /// Delete confirmed by the user. `false` when refused (unknown tag or a
    /// mutation already pending).
    pub fn begin_delete(&mut self, tag_id: TagId) -> bool {
        if self.in_flight.is_some() || !self.tags.contains_key(&tag_id) {
            return false;
        }
        self.in_flight = Some(InFlight::Delete(tag_id));
        true
    }

    /// Server accepted the save: the tag becomes permanent, the temporary
    /// marker disappears and tagging mode turns off.
    pub fn save_succeeded(&mut self, tag_id: TagId) -> Option<&Tag> {
        let pending = match self.in_flight.take() {
            Some(InFlight::Save(pending)) => pending,
            other => {
                self.in_flight = other;
                return None;
            }
        };
        let tag = Tag {
            id: tag_id,
            user_id: pending.user_id,
            user_name: pending.user_name,
            shape: "rect".to_owned(),
            coords: pending.bbox.coords_string(),
        };
        self.tags.insert(tag_id, tag);
        self.pending_point = None;
        self.phase = Phase::Idle;
        self.tags.get(&tag_id)
    }

    /// Server accepted the delete. Returns whether an entry was removed.
    pub fn delete_succeeded(&mut self, tag_id: TagId) -> bool {
        if matches!(self.in_flight, Some(InFlight::Delete(id)) if id == tag_id) {
            self.in_flight = None;
        }
        self.tags.remove(&tag_id).is_some()
    }

    /// Any failed mutation releases the slot and changes nothing else: the
    /// dialog, temporary marker and tag map stay as they were.
    pub fn mutation_failed(&mut self) {
        self.in_flight = None;
    }
}
