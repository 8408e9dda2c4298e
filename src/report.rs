use anyhow::Context;
use serde::Serialize;
use std::path::Path;

use crate::calc::GradeBand;
use crate::ids;
use crate::model::number;
use crate::store::Gradebook;
use crate::views;

pub const NO_ENTRY: &str = "-";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportColumn {
    pub column_id: String,
    pub name: String,
    pub kind: &'static str,
    pub kind_label: &'static str,
    #[serde(serialize_with = "number::serialize")]
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCell {
    #[serde(serialize_with = "number::serialize_opt")]
    pub value: Option<f64>,
    pub band: Option<GradeBand>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: String,
    pub display_name: String,
    pub cells: Vec<ReportCell>,
    pub average: Option<f64>,
    pub average_band: Option<GradeBand>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectReport {
    pub school_year_name: Option<String>,
    pub class_name: Option<String>,
    pub subject_id: String,
    pub subject_name: String,
    pub generated_on: String,
    pub no_entry_marker: &'static str,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ReportRow>,
}

/// Grade table for the currently selected subject; `None` without one.
pub fn subject_report(store: &Gradebook) -> Option<SubjectReport> {
    let doc = store.document();
    let subject = views::find_subject(doc, store.current_subject()?)?;
    let class = views::find_class(doc, &subject.class_id);
    let school_year = class.and_then(|c| views::find_school_year(doc, &c.school_year_id));

    let columns = views::columns_of(doc, &subject.id);
    let rows = views::students_of(doc, &subject.id)
        .into_iter()
        .map(|student| {
            let cells = columns
                .iter()
                .map(|col| {
                    let value = views::entry_for_cell(doc, &student.id, &col.id).map(|n| n.value);
                    ReportCell {
                        value,
                        band: value.map(GradeBand::of),
                    }
                })
                .collect();
            let average = store.compute_student_average(&student.id);
            ReportRow {
                student_id: student.id.clone(),
                display_name: student.display_name(),
                cells,
                average,
                average_band: average.map(GradeBand::of),
            }
        })
        .collect();

    Some(SubjectReport {
        school_year_name: school_year.map(|s| s.name.clone()),
        class_name: class.map(|c| c.name.clone()),
        subject_id: subject.id.clone(),
        subject_name: subject.name.clone(),
        generated_on: ids::today(),
        no_entry_marker: NO_ENTRY,
        columns: columns
            .iter()
            .map(|c| ReportColumn {
                column_id: c.id.clone(),
                name: c.name.clone(),
                kind: c.kind.as_str(),
                kind_label: c.kind.label(),
                weight: c.weight,
            })
            .collect(),
        rows,
    })
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn format_average(avg: Option<f64>) -> String {
    match avg {
        Some(v) => format!("{:.2}", v),
        None => NO_ENTRY.to_string(),
    }
}

impl SubjectReport {
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let mut header = vec![csv_quote("Schüler")];
        for c in &self.columns {
            header.push(csv_quote(&format!(
                "{} - {} ({}x)",
                c.name, c.kind_label, c.weight
            )));
        }
        header.push(csv_quote("Ø"));
        out.push_str(&header.join(","));
        out.push('\n');

        for row in &self.rows {
            let mut fields = vec![csv_quote(&row.display_name)];
            for cell in &row.cells {
                fields.push(match cell.value {
                    Some(v) => v.to_string(),
                    None => NO_ENTRY.to_string(),
                });
            }
            fields.push(format_average(row.average));
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, out_path: &Path) -> anyhow::Result<usize> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        std::fs::write(out_path, self.to_csv().as_bytes())
            .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
        Ok(self.rows.len())
    }
}
