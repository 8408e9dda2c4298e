//! Gradebook entities and the flat document they are persisted in.
//!
//! Field names on the wire are the ones the desktop app has always written,
//! so existing data files and backups deserialize unchanged. Missing fields
//! fall back to defaults; only the six top-level keys are ever checked
//! (see `backup::read_import_file`).

use serde::{Deserialize, Serialize};

pub const COLLECTION_KEYS: [&str; 6] = [
    "schuljahre",
    "klassen",
    "faecher",
    "schueler",
    "notenspalten",
    "noten",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolYear {
    pub id: String,
    pub name: String,
    #[serde(rename = "aktiv")]
    pub active: bool,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Class {
    pub id: String,
    #[serde(rename = "schuljahrId")]
    pub school_year_id: String,
    pub name: String,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: String,
    #[serde(rename = "klasseId")]
    pub class_id: String,
    pub name: String,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Student {
    pub id: String,
    #[serde(rename = "fachId")]
    pub subject_id: String,
    #[serde(rename = "vorname")]
    pub first_name: String,
    #[serde(rename = "nachname")]
    pub last_name: String,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

impl Student {
    /// `"Nachname, Vorname"` as shown in grade tables.
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeColumnKind {
    #[serde(rename = "schulaufgabe", alias = "written_exam")]
    WrittenExam,
    #[serde(rename = "stegreifaufgabe", alias = "pop_quiz")]
    PopQuiz,
    #[serde(rename = "muendlich", alias = "oral")]
    Oral,
    #[default]
    #[serde(rename = "sonstiges", alias = "other")]
    Other,
}

impl GradeColumnKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "schulaufgabe" | "written_exam" => Some(Self::WrittenExam),
            "stegreifaufgabe" | "pop_quiz" => Some(Self::PopQuiz),
            "muendlich" | "oral" => Some(Self::Oral),
            "sonstiges" | "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WrittenExam => "schulaufgabe",
            Self::PopQuiz => "stegreifaufgabe",
            Self::Oral => "muendlich",
            Self::Other => "sonstiges",
        }
    }

    /// Column header label used in printed reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::WrittenExam => "Schulaufgabe",
            Self::PopQuiz => "Stegreifaufgabe",
            Self::Oral => "Mündlich",
            Self::Other => "Sonstiges",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeColumn {
    pub id: String,
    #[serde(rename = "fachId")]
    pub subject_id: String,
    #[serde(rename = "visibleName")]
    pub name: String,
    #[serde(rename = "typ")]
    pub kind: GradeColumnKind,
    #[serde(
        rename = "gewichtung",
        serialize_with = "number::serialize",
        deserialize_with = "number::weight"
    )]
    pub weight: f64,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

impl Default for GradeColumn {
    fn default() -> Self {
        Self {
            id: String::new(),
            subject_id: String::new(),
            name: String::new(),
            kind: GradeColumnKind::default(),
            weight: 1.0,
            created_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeEntry {
    pub id: String,
    #[serde(rename = "schuelerId")]
    pub student_id: String,
    #[serde(rename = "notenspalteId")]
    pub column_id: String,
    #[serde(
        rename = "wert",
        serialize_with = "number::serialize",
        deserialize_with = "number::value"
    )]
    pub value: f64,
    #[serde(rename = "datum")]
    pub date: String,
    #[serde(rename = "kommentar")]
    pub comment: String,
    #[serde(rename = "erstelltAm")]
    pub created_at: String,
}

/// Grade values and weights as the desktop app stores them: any JSON number,
/// written back without a fraction when integral. `null` reads as the default.
pub mod number {
    use serde::{Deserialize, Deserializer, Serializer};

    const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

    pub fn to_json(v: f64) -> serde_json::Value {
        if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INT {
            serde_json::Value::from(v as i64)
        } else {
            serde_json::Value::from(v)
        }
    }

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INT {
            s.serialize_i64(*v as i64)
        } else {
            s.serialize_f64(*v)
        }
    }

    pub fn serialize_opt<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(v) => serialize(v, s),
            None => s.serialize_none(),
        }
    }

    pub fn weight<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(1.0))
    }

    pub fn value<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
    }
}

/// All six collections, persisted as one JSON object with no envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "schuljahre")]
    pub school_years: Vec<SchoolYear>,
    #[serde(rename = "klassen")]
    pub classes: Vec<Class>,
    #[serde(rename = "faecher")]
    pub subjects: Vec<Subject>,
    #[serde(rename = "schueler")]
    pub students: Vec<Student>,
    #[serde(rename = "notenspalten")]
    pub grade_columns: Vec<GradeColumn>,
    #[serde(rename = "noten")]
    pub grade_entries: Vec<GradeEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCounts {
    pub school_years: usize,
    pub classes: usize,
    pub subjects: usize,
    pub students: usize,
    pub grade_columns: usize,
    pub grade_entries: usize,
}

impl Document {
    pub fn counts(&self) -> DocumentCounts {
        DocumentCounts {
            school_years: self.school_years.len(),
            classes: self.classes.len(),
            subjects: self.subjects.len(),
            students: self.students.len(),
            grade_columns: self.grade_columns.len(),
            grade_entries: self.grade_entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_uses_legacy_collection_keys() {
        let v = serde_json::to_value(Document::default()).expect("serialize");
        let obj = v.as_object().expect("object");
        assert_eq!(obj.len(), COLLECTION_KEYS.len());
        for key in COLLECTION_KEYS {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn grade_column_reads_legacy_fields_and_defaults() {
        let col: GradeColumn = serde_json::from_value(json!({
            "id": "n1",
            "fachId": "f1",
            "visibleName": "1. Schulaufgabe",
            "typ": "schulaufgabe",
            "gewichtung": 2,
            "erstelltAm": "2024-09-12"
        }))
        .expect("parse column");
        assert_eq!(col.kind, GradeColumnKind::WrittenExam);
        assert_eq!(col.weight, 2.0);

        let sparse: GradeColumn =
            serde_json::from_value(json!({ "id": "n2" })).expect("parse sparse column");
        assert_eq!(sparse.weight, 1.0);
        assert_eq!(sparse.kind, GradeColumnKind::Other);
    }

    #[test]
    fn fractional_numbers_survive_a_roundtrip() {
        let col: GradeColumn = serde_json::from_value(json!({
            "id": "n1",
            "typ": "muendlich",
            "gewichtung": 1.5
        }))
        .expect("fractional weight");
        assert_eq!(col.weight, 1.5);
        let entry: GradeEntry = serde_json::from_value(json!({ "id": "e1", "wert": 2.5 }))
            .expect("fractional value");
        assert_eq!(entry.value, 2.5);

        let col_json = serde_json::to_value(&col).expect("serialize column");
        assert_eq!(col_json["gewichtung"], json!(1.5));
        let entry_json = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(entry_json["wert"], json!(2.5));
    }

    #[test]
    fn integral_numbers_are_written_without_fraction_and_null_reads_as_default() {
        let col: GradeColumn =
            serde_json::from_value(json!({ "id": "n1", "gewichtung": null })).expect("null weight");
        assert_eq!(col.weight, 1.0);
        let entry: GradeEntry = serde_json::from_value(json!({ "id": "e1", "wert": 3 }))
            .expect("integer value");
        let text = serde_json::to_string(&entry).expect("serialize entry");
        assert!(text.contains("\"wert\":3,"), "{text}");
        assert_eq!(number::to_json(2.0), json!(2));
        assert_eq!(number::to_json(2.67), json!(2.67));
    }

    #[test]
    fn kind_accepts_english_aliases() {
        let kind: GradeColumnKind = serde_json::from_value(json!("pop_quiz")).expect("alias");
        assert_eq!(kind, GradeColumnKind::PopQuiz);
        assert_eq!(GradeColumnKind::parse(" Oral "), Some(GradeColumnKind::Oral));
        assert_eq!(GradeColumnKind::parse("essay"), None);
        assert_eq!(
            serde_json::to_value(GradeColumnKind::Oral).expect("serialize"),
            json!("muendlich")
        );
    }
}
