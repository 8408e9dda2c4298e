pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod grade_columns;
pub mod grades;
pub mod reports;
pub mod school_years;
pub mod students;
pub mod subjects;
