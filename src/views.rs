//! Read-only projections over a [`Document`] consumed by listings and reports.

use std::cmp::Ordering;

use crate::model::{Class, Document, GradeColumn, GradeEntry, SchoolYear, Student, Subject};

pub fn find_school_year<'a>(doc: &'a Document, id: &str) -> Option<&'a SchoolYear> {
    doc.school_years.iter().find(|s| s.id == id)
}

pub fn find_class<'a>(doc: &'a Document, id: &str) -> Option<&'a Class> {
    doc.classes.iter().find(|c| c.id == id)
}

pub fn find_subject<'a>(doc: &'a Document, id: &str) -> Option<&'a Subject> {
    doc.subjects.iter().find(|s| s.id == id)
}

pub fn find_student<'a>(doc: &'a Document, id: &str) -> Option<&'a Student> {
    doc.students.iter().find(|s| s.id == id)
}

pub fn find_column<'a>(doc: &'a Document, id: &str) -> Option<&'a GradeColumn> {
    doc.grade_columns.iter().find(|c| c.id == id)
}

#[cfg(test)]
pub fn find_entry<'a>(doc: &'a Document, id: &str) -> Option<&'a GradeEntry> {
    doc.grade_entries.iter().find(|n| n.id == id)
}

pub fn classes_of<'a>(doc: &'a Document, school_year_id: &str) -> Vec<&'a Class> {
    doc.classes
        .iter()
        .filter(|c| c.school_year_id == school_year_id)
        .collect()
}

pub fn subjects_of<'a>(doc: &'a Document, class_id: &str) -> Vec<&'a Subject> {
    doc.subjects
        .iter()
        .filter(|s| s.class_id == class_id)
        .collect()
}

pub fn columns_of<'a>(doc: &'a Document, subject_id: &str) -> Vec<&'a GradeColumn> {
    doc.grade_columns
        .iter()
        .filter(|c| c.subject_id == subject_id)
        .collect()
}

/// Students of a subject ordered by last name, then first name. Raw spelling
/// only decides between names that fold to the same text.
pub fn students_of<'a>(doc: &'a Document, subject_id: &str) -> Vec<&'a Student> {
    let mut out: Vec<&Student> = doc
        .students
        .iter()
        .filter(|s| s.subject_id == subject_id)
        .collect();
    out.sort_by(|a, b| {
        collation_key(&a.last_name)
            .cmp(&collation_key(&b.last_name))
            .then_with(|| collation_key(&a.first_name).cmp(&collation_key(&b.first_name)))
            .then_with(|| compare_spelling(&a.last_name, &b.last_name))
            .then_with(|| compare_spelling(&a.first_name, &b.first_name))
    });
    out
}

pub fn entries_of_student<'a>(doc: &'a Document, student_id: &str) -> Vec<&'a GradeEntry> {
    doc.grade_entries
        .iter()
        .filter(|n| n.student_id == student_id)
        .collect()
}

/// Entries belonging to any student of the subject.
pub fn entries_of_subject<'a>(doc: &'a Document, subject_id: &str) -> Vec<&'a GradeEntry> {
    let student_ids: std::collections::HashSet<&str> = doc
        .students
        .iter()
        .filter(|s| s.subject_id == subject_id)
        .map(|s| s.id.as_str())
        .collect();
    doc.grade_entries
        .iter()
        .filter(|n| student_ids.contains(n.student_id.as_str()))
        .collect()
}

/// First entry for the (student, column) cell in collection order.
pub fn entry_for_cell<'a>(
    doc: &'a Document,
    student_id: &str,
    column_id: &str,
) -> Option<&'a GradeEntry> {
    doc.grade_entries
        .iter()
        .find(|n| n.student_id == student_id && n.column_id == column_id)
}

pub fn count_classes(doc: &Document, school_year_id: &str) -> usize {
    doc.classes
        .iter()
        .filter(|c| c.school_year_id == school_year_id)
        .count()
}

pub fn count_subjects(doc: &Document, class_id: &str) -> usize {
    doc.subjects.iter().filter(|s| s.class_id == class_id).count()
}

pub fn count_students(doc: &Document, subject_id: &str) -> usize {
    doc.students
        .iter()
        .filter(|s| s.subject_id == subject_id)
        .count()
}

pub fn count_columns(doc: &Document, subject_id: &str) -> usize {
    doc.grade_columns
        .iter()
        .filter(|c| c.subject_id == subject_id)
        .count()
}

/// Lowercase before uppercase at the first differing letter (`becker` <
/// `Becker`), then code point order.
fn compare_spelling(a: &str, b: &str) -> Ordering {
    let rank = |c: char| (c.is_uppercase(), c);
    a.chars().map(rank).cmp(b.chars().map(rank))
}

/// Locale-aware sort key: case-insensitive, diacritics folded to the base
/// letter (`Ä` sorts with `A`, `ß` as `ss`).
fn collation_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.trim().chars() {
        match fold_char(ch) {
            Folded::One(c) => out.push(c),
            Folded::Two(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }
    out
}

enum Folded {
    One(char),
    Two(char, char),
}

fn fold_char(ch: char) -> Folded {
    let lower = ch.to_lowercase().next().unwrap_or(ch);
    let base = match lower {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ğ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => 'i',
        'ł' | 'ľ' => 'l',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        'ß' => return Folded::Two('s', 's'),
        'æ' => return Folded::Two('a', 'e'),
        'œ' => return Folded::Two('o', 'e'),
        other => other,
    };
    Folded::One(base)
}
