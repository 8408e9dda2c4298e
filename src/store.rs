//! The gradebook domain store.
//!
//! # Responsibility
//! - Own the six entity collections and the three selection pointers.
//! - Keep the school-year → class → subject → student/column → entry tree
//!   consistent: every delete cascades to all descendants.
//! - Hand a snapshot to the persist worker after each mutation.
//!
//! # Invariants
//! - After any delete, no grade entry references a missing student or column.
//! - At most one school year is active after `set_active_school_year`.
//! - Selection reads are validated: an id that no longer resolves reads as
//!   unset.
//! - Mutations never fail because persistence failed.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::calc;
use crate::ids;
use crate::model::{
    Class, Document, GradeColumn, GradeColumnKind, GradeEntry, SchoolYear, Student, Subject,
};
use crate::persist::{self, DocumentGateway, Persister};
use crate::views;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loaded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub school_year: Option<String>,
    pub class: Option<String>,
    pub subject: Option<String>,
}

pub struct Gradebook {
    doc: Document,
    selection: Selection,
    load_state: LoadState,
    gateway: Arc<dyn DocumentGateway>,
    persister: Persister,
}

impl Gradebook {
    /// Creates an empty, uninitialized store writing through `gateway`.
    pub fn new(gateway: Arc<dyn DocumentGateway>) -> anyhow::Result<Self> {
        let persister = Persister::spawn(gateway.clone())?;
        Ok(Self {
            doc: Document::default(),
            selection: Selection::default(),
            load_state: LoadState::Uninitialized,
            gateway,
            persister,
        })
    }

    pub fn open(gateway: Arc<dyn DocumentGateway>) -> anyhow::Result<Self> {
        let mut store = Self::new(gateway)?;
        store.initialize();
        Ok(store)
    }

    /// Loads the persisted document. Missing or unreadable data loads as empty.
    pub fn initialize(&mut self) {
        let doc = match self.gateway.load() {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                info!(
                    "event=store_load module=store status=empty source={}",
                    self.gateway.describe()
                );
                Document::default()
            }
            Err(e) => {
                warn!(
                    "event=store_load module=store status=error source={} error={:#}",
                    self.gateway.describe(),
                    e
                );
                Document::default()
            }
        };
        self.doc = doc;
        self.recompute_selection();
        self.load_state = LoadState::Loaded;
        info!(
            "event=store_load module=store status=ok school_years={} entries={}",
            self.doc.school_years.len(),
            self.doc.grade_entries.len()
        );
    }

    fn recompute_selection(&mut self) {
        let active: Vec<&SchoolYear> = self.doc.school_years.iter().filter(|s| s.active).collect();
        if active.len() > 1 {
            warn!(
                "event=store_load module=store status=inconsistent active_school_years={} picked={}",
                active.len(),
                active[0].id
            );
        }
        self.selection = Selection {
            school_year: active.first().map(|s| s.id.clone()),
            class: None,
            subject: None,
        };
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Raw selection ids as last set, possibly dangling.
    #[cfg(test)]
    pub fn raw_selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_school_year(&self) -> Option<&str> {
        let id = self.selection.school_year.as_deref()?;
        views::find_school_year(&self.doc, id).map(|s| s.id.as_str())
    }

    pub fn current_class(&self) -> Option<&str> {
        let id = self.selection.class.as_deref()?;
        views::find_class(&self.doc, id).map(|c| c.id.as_str())
    }

    pub fn current_subject(&self) -> Option<&str> {
        let id = self.selection.subject.as_deref()?;
        views::find_subject(&self.doc, id).map(|s| s.id.as_str())
    }

    /// Selection with dangling ids replaced by `None`.
    pub fn selection(&self) -> Selection {
        Selection {
            school_year: self.current_school_year().map(str::to_string),
            class: self.current_class().map(str::to_string),
            subject: self.current_subject().map(str::to_string),
        }
    }

    /// Waits for queued snapshots to reach the gateway.
    pub fn flush(&self) {
        self.persister.flush();
    }

    fn commit(&self, op: &str) {
        debug!("event=store_mutation module=store op={}", op);
        self.persister.submit(self.doc.clone());
    }

    // School years

    pub fn add_school_year(&mut self, name: &str) -> String {
        let year = SchoolYear {
            id: ids::new_id(),
            name: name.to_string(),
            active: self.doc.school_years.is_empty(),
            created_at: ids::today(),
        };
        let id = year.id.clone();
        if year.active {
            self.selection.school_year = Some(id.clone());
        }
        self.doc.school_years.push(year);
        self.commit("add_school_year");
        id
    }

    pub fn set_active_school_year(&mut self, id: &str) {
        for year in &mut self.doc.school_years {
            year.active = year.id == id;
        }
        self.selection = Selection {
            school_year: Some(id.to_string()),
            class: None,
            subject: None,
        };
        self.commit("set_active_school_year");
    }

    pub fn delete_school_year(&mut self, id: &str) {
        self.doc.school_years.retain(|s| s.id != id);
        let class_ids: HashSet<String> = self
            .doc
            .classes
            .iter()
            .filter(|c| c.school_year_id == id)
            .map(|c| c.id.clone())
            .collect();
        self.doc.classes.retain(|c| c.school_year_id != id);
        self.cascade_classes(&class_ids);

        if self.selection.school_year.as_deref() == Some(id) {
            self.selection.school_year = self.doc.school_years.first().map(|s| s.id.clone());
        }
        self.selection.class = None;
        self.selection.subject = None;
        self.commit("delete_school_year");
    }

    // Classes

    pub fn add_class(&mut self, name: &str) -> Option<String> {
        let school_year_id = self.current_school_year()?.to_string();
        let class = Class {
            id: ids::new_id(),
            school_year_id,
            name: name.to_string(),
            created_at: ids::today(),
        };
        let id = class.id.clone();
        self.doc.classes.push(class);
        self.commit("add_class");
        Some(id)
    }

    /// Returns whether a class with `id` existed.
    pub fn update_class(&mut self, id: &str, name: &str) -> bool {
        let mut found = false;
        for class in self.doc.classes.iter_mut().filter(|c| c.id == id) {
            class.name = name.to_string();
            found = true;
        }
        self.commit("update_class");
        found
    }

    pub fn delete_class(&mut self, id: &str) {
        self.doc.classes.retain(|c| c.id != id);
        let removed: HashSet<String> = std::iter::once(id.to_string()).collect();
        self.cascade_classes(&removed);

        if self.selection.class.as_deref() == Some(id) {
            self.selection.class = None;
        }
        self.selection.subject = None;
        self.commit("delete_class");
    }

    /// Always clears the subject selection, even if `id` is unchanged.
    pub fn set_current_class(&mut self, id: Option<&str>) {
        self.selection.class = id.map(str::to_string);
        self.selection.subject = None;
    }

    // Subjects

    pub fn add_subject(&mut self, name: &str) -> Option<String> {
        let class_id = self.current_class()?.to_string();
        let subject = Subject {
            id: ids::new_id(),
            class_id,
            name: name.to_string(),
            created_at: ids::today(),
        };
        let id = subject.id.clone();
        self.doc.subjects.push(subject);
        self.commit("add_subject");
        Some(id)
    }

    pub fn update_subject(&mut self, id: &str, name: &str) -> bool {
        let mut found = false;
        for subject in self.doc.subjects.iter_mut().filter(|s| s.id == id) {
            subject.name = name.to_string();
            found = true;
        }
        self.commit("update_subject");
        found
    }

    pub fn delete_subject(&mut self, id: &str) {
        self.doc.subjects.retain(|s| s.id != id);
        let removed: HashSet<String> = std::iter::once(id.to_string()).collect();
        self.cascade_subjects(&removed);

        if self.selection.subject.as_deref() == Some(id) {
            self.selection.subject = None;
        }
        self.commit("delete_subject");
    }

    pub fn set_current_subject(&mut self, id: Option<&str>) {
        self.selection.subject = id.map(str::to_string);
    }

    // Students

    pub fn add_student(&mut self, first_name: &str, last_name: &str) -> Option<String> {
        let subject_id = self.current_subject()?.to_string();
        let student = Student {
            id: ids::new_id(),
            subject_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            created_at: ids::today(),
        };
        let id = student.id.clone();
        self.doc.students.push(student);
        self.commit("add_student");
        Some(id)
    }

    pub fn update_student(&mut self, id: &str, first_name: &str, last_name: &str) -> bool {
        let mut found = false;
        for student in self.doc.students.iter_mut().filter(|s| s.id == id) {
            student.first_name = first_name.to_string();
            student.last_name = last_name.to_string();
            found = true;
        }
        self.commit("update_student");
        found
    }

    pub fn delete_student(&mut self, id: &str) {
        self.doc.students.retain(|s| s.id != id);
        self.doc.grade_entries.retain(|n| n.student_id != id);
        self.commit("delete_student");
    }

    // Grade columns

    pub fn add_grade_column(
        &mut self,
        name: &str,
        kind: GradeColumnKind,
        weight: f64,
    ) -> Option<String> {
        let subject_id = self.current_subject()?.to_string();
        let column = GradeColumn {
            id: ids::new_id(),
            subject_id,
            name: name.to_string(),
            kind,
            weight: coerce_weight(weight),
            created_at: ids::today(),
        };
        let id = column.id.clone();
        self.doc.grade_columns.push(column);
        self.commit("add_grade_column");
        Some(id)
    }

    /// Unlike `add_grade_column`, the weight is stored exactly as given.
    pub fn update_grade_column(
        &mut self,
        id: &str,
        name: &str,
        kind: GradeColumnKind,
        weight: f64,
    ) -> bool {
        let mut found = false;
        for column in self.doc.grade_columns.iter_mut().filter(|c| c.id == id) {
            column.name = name.to_string();
            column.kind = kind;
            column.weight = weight;
            found = true;
        }
        self.commit("update_grade_column");
        found
    }

    pub fn delete_grade_column(&mut self, id: &str) {
        self.doc.grade_columns.retain(|c| c.id != id);
        self.doc.grade_entries.retain(|n| n.column_id != id);
        self.commit("delete_grade_column");
    }

    // Grade entries

    /// Stores the entry as given; range and reference checks belong to the caller.
    pub fn add_grade_entry(
        &mut self,
        student_id: &str,
        column_id: &str,
        value: f64,
        date: &str,
        comment: &str,
    ) -> String {
        let entry = GradeEntry {
            id: ids::new_id(),
            student_id: student_id.to_string(),
            column_id: column_id.to_string(),
            value,
            date: date.to_string(),
            comment: comment.to_string(),
            created_at: ids::today(),
        };
        let id = entry.id.clone();
        self.doc.grade_entries.push(entry);
        self.commit("add_grade_entry");
        id
    }

    pub fn update_grade_entry(&mut self, id: &str, value: f64, date: &str, comment: &str) -> bool {
        let mut found = false;
        for entry in self.doc.grade_entries.iter_mut().filter(|n| n.id == id) {
            entry.value = value;
            entry.date = date.to_string();
            entry.comment = comment.to_string();
            found = true;
        }
        self.commit("update_grade_entry");
        found
    }

    pub fn delete_grade_entry(&mut self, id: &str) {
        self.doc.grade_entries.retain(|n| n.id != id);
        self.commit("delete_grade_entry");
    }

    /// Find-or-create for one (student, column) cell. Returns the entry id and
    /// whether it was newly created.
    pub fn set_grade(
        &mut self,
        student_id: &str,
        column_id: &str,
        value: f64,
        date: &str,
        comment: &str,
    ) -> (String, bool) {
        let existing = views::entry_for_cell(&self.doc, student_id, column_id).map(|n| n.id.clone());
        match existing {
            Some(id) => {
                self.update_grade_entry(&id, value, date, comment);
                (id, false)
            }
            None => (
                self.add_grade_entry(student_id, column_id, value, date, comment),
                true,
            ),
        }
    }

    // Averages

    pub fn compute_student_average(&self, student_id: &str) -> Option<f64> {
        let doc = &self.doc;
        calc::weighted_average(views::entries_of_student(doc, student_id), |column_id| {
            views::find_column(doc, column_id)
        })
    }

    // Whole-document replacement

    /// Replaces everything with `doc`, writes it through synchronously, and
    /// re-derives the selection as a fresh load would.
    pub fn replace_document(&mut self, doc: Document) {
        self.persister.flush();
        self.doc = doc;
        persist::save_logged(self.gateway.as_ref(), &self.doc);
        self.recompute_selection();
        self.load_state = LoadState::Loaded;
        info!(
            "event=store_replace module=store status=ok school_years={} entries={}",
            self.doc.school_years.len(),
            self.doc.grade_entries.len()
        );
    }

    // Cascades

    fn cascade_classes(&mut self, class_ids: &HashSet<String>) {
        if class_ids.is_empty() {
            return;
        }
        let subject_ids: HashSet<String> = self
            .doc
            .subjects
            .iter()
            .filter(|s| class_ids.contains(&s.class_id))
            .map(|s| s.id.clone())
            .collect();
        self.doc.subjects.retain(|s| !class_ids.contains(&s.class_id));
        self.cascade_subjects(&subject_ids);
    }

    fn cascade_subjects(&mut self, subject_ids: &HashSet<String>) {
        if subject_ids.is_empty() {
            return;
        }
        let student_ids: HashSet<String> = self
            .doc
            .students
            .iter()
            .filter(|s| subject_ids.contains(&s.subject_id))
            .map(|s| s.id.clone())
            .collect();
        let column_ids: HashSet<String> = self
            .doc
            .grade_columns
            .iter()
            .filter(|c| subject_ids.contains(&c.subject_id))
            .map(|c| c.id.clone())
            .collect();
        self.doc
            .students
            .retain(|s| !subject_ids.contains(&s.subject_id));
        self.doc
            .grade_columns
            .retain(|c| !subject_ids.contains(&c.subject_id));
        self.doc.grade_entries.retain(|n| {
            !student_ids.contains(&n.student_id) && !column_ids.contains(&n.column_id)
        });
    }
}

/// Weight for a new column: non-finite or non-positive becomes 1, fractions
/// round to the nearest integer but never below 1.
pub fn coerce_weight(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    raw.round().max(1.0)
}
