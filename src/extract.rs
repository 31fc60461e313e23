//! Spreadsheet extraction.
//!
//! Every export workbook carries one translation per row. Cells are mapped
//! positionally onto the column names declared for that workbook, marker rows
//! are dropped and the remaining rows are reduced to `EntryFields`.

use crate::error::{Result, ReviewError};
use crate::models::EntryFields;
use calamine::{open_workbook_auto, Data, Range, Reader};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column names used by the export workbooks
pub mod columns {
    /// Export version marker
    pub const VERSION: &str = "Version";
    /// Kind of change requested
    pub const CHANGE_TYPE: &str = "ChangeType";
    /// Source file of the string
    pub const FILE_NAME: &str = "FileName";
    /// Property holding the string
    pub const PROPERTY_NAME: &str = "PropertyName";
    /// English component name
    pub const COMPONENT_EN: &str = "ComponentEn";
    /// English path
    pub const PATH_EN: &str = "PathForEn";
    /// Current English text
    pub const EXISTING_EN: &str = "ExistingEn";
    /// Replacement English text
    pub const NEW_EN: &str = "NewEn";
    /// Reviewer comments on the English text
    pub const COMMENTS_EN: &str = "CommentsEn";
    /// French component name
    pub const COMPONENT_FR: &str = "ComponentFr";
    /// French path
    pub const PATH_FR: &str = "PathForFr";
    /// Current French text
    pub const EXISTING_FR: &str = "ExistingFr";
    /// Replacement French text
    pub const NEW_FR: &str = "NewFr";
    /// Reviewer comments on the French text
    pub const COMMENTS_FR: &str = "CommentsFr";
}

/// Values of the `Version` column that mark non-data rows
const MARKER_VERSIONS: [&str; 2] = ["DO NOT EDIT", columns::VERSION];

/// A raw row: column name to trimmed cell text, empty cells omitted
pub type RawRecord = HashMap<String, String>;

/// Layout of one export workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetDef {
    /// Workbook path relative to the extracts directory, without `.xlsx`
    pub src_file: String,
    /// Short display name
    pub out_file: String,
    /// Sheet to read; the configured default when absent
    #[serde(default)]
    pub sheet_name: Option<String>,
    /// Column names in sheet order
    pub headers: Vec<String>,
    /// Skip this workbook
    #[serde(default)]
    pub disabled: bool,
    /// Read at most this many rows
    #[serde(default)]
    pub sheet_rows: Option<usize>,
}

impl SheetDef {
    fn new(src_file: &str, out_file: &str, headers: &[&str]) -> Self {
        Self {
            src_file: src_file.to_string(),
            out_file: out_file.to_string(),
            sheet_name: None,
            headers: headers.iter().map(ToString::to_string).collect(),
            disabled: false,
            sheet_rows: None,
        }
    }

    fn on_sheet(mut self, sheet_name: &str) -> Self {
        self.sheet_name = Some(sheet_name.to_string());
        self
    }

    fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Path of the workbook inside `extracts_dir`
    #[must_use]
    pub fn workbook_path(&self, extracts_dir: &Path) -> PathBuf {
        extracts_dir.join(format!("{}.xlsx", self.src_file))
    }
}

/// The standard export layouts
#[must_use]
pub fn default_sheets() -> Vec<SheetDef> {
    use columns::*;

    let standard = [
        VERSION, CHANGE_TYPE, COMPONENT_EN, FILE_NAME, PROPERTY_NAME, EXISTING_EN, NEW_EN,
        COMMENTS_EN, EXISTING_FR, NEW_FR, COMMENTS_FR,
    ];
    let with_path = [
        VERSION, CHANGE_TYPE, COMPONENT_EN, PATH_EN, FILE_NAME, PROPERTY_NAME, EXISTING_EN,
        NEW_EN, COMMENTS_EN, EXISTING_FR, NEW_FR, COMMENTS_FR,
    ];
    let bilingual_path = [
        VERSION, CHANGE_TYPE, FILE_NAME, PROPERTY_NAME, PATH_EN, COMPONENT_EN, EXISTING_EN,
        NEW_EN, COMMENTS_EN, PATH_FR, COMPONENT_FR, EXISTING_FR, NEW_FR, COMMENTS_FR,
    ];
    let workflow = [
        VERSION, CHANGE_TYPE, COMPONENT_EN, FILE_NAME, "TagType", "SubTagType", PROPERTY_NAME,
        EXISTING_EN, NEW_EN, COMMENTS_EN, EXISTING_FR, NEW_FR, COMMENTS_FR,
    ];

    vec![
        SheetDef::new("2/Translate_CE_React Extract 2", "CE React", &standard),
        SheetDef::new("2/Translate_UIM_ Extract 2", "UIM", &bilingual_path),
        SheetDef::new("2/Translate_Rules_Extract 2", "Rules", &with_path),
        SheetDef::new("2/Translate_Navigation_Extract 2", "Navigation", &with_path),
        SheetDef::new("2/Translate_Messages _ Extract 2", "Messages", &standard),
        SheetDef::new("2/Translate_IEG_Extract 2", "IEG", &standard),
        SheetDef::new("2/Code tables Extract 2", "Code Tables", &standard).on_sheet("Sheet1"),
        SheetDef::new(
            "2/Extract CE React _ Translated 20240207_ CLarifications",
            "CE React 2",
            &standard,
        )
        .on_sheet("Sheet1"),
        SheetDef::new("2/DMX_Workflow Extract 2", "DMX Workflow", &workflow),
        SheetDef::new("2/Translate_Blob_Extract 2", "Blob", &standard).disabled(),
    ]
}

/// Render a cell the way it reads in the sheet
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
    }
}

/// Map the rows of `range` onto `headers` by absolute column position.
///
/// Blank rows are skipped; `row_limit` counts sheet rows from the top.
#[must_use]
pub fn range_to_records(range: &Range<Data>, headers: &[String], row_limit: Option<usize>) -> Vec<RawRecord> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let first_col = start_col as usize;

    range
        .rows()
        .enumerate()
        .take_while(|(offset, _)| row_limit.map_or(true, |limit| (start_row as usize + offset) < limit))
        .filter_map(|(_, row)| {
            let record: RawRecord = row
                .iter()
                .enumerate()
                .filter_map(|(i, cell)| {
                    let header = headers.get(first_col + i)?;
                    let text = cell_to_string(cell).trim().to_string();
                    (!text.is_empty()).then(|| (header.clone(), text))
                })
                .collect();
            (!record.is_empty()).then_some(record)
        })
        .collect()
}

/// Read the raw records of one workbook
pub fn read_sheet(def: &SheetDef, extracts_dir: &Path, default_sheet: &str, row_limit: Option<usize>) -> Result<Vec<RawRecord>> {
    let path = def.workbook_path(extracts_dir);
    let sheet_name = def.sheet_name.as_deref().unwrap_or(default_sheet);
    debug!(path = %path.display(), sheet = sheet_name, "Reading workbook");

    let mut workbook = open_workbook_auto(&path)
        .map_err(|e| ReviewError::Spreadsheet(format!("Cannot open {}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| ReviewError::Spreadsheet(format!("Cannot read sheet {sheet_name} of {}: {}", path.display(), e)))?;

    Ok(range_to_records(&range, &def.headers, row_limit.or(def.sheet_rows)))
}

/// True for the header row and the "do not edit" banner
#[must_use]
pub fn is_marker_row(record: &RawRecord) -> bool {
    record
        .get(columns::VERSION)
        .is_some_and(|version| MARKER_VERSIONS.contains(&version.as_str()))
}

/// New text when present, otherwise the existing text
fn pick_text(record: &RawRecord, new_column: &str, existing_column: &str) -> Option<String> {
    record
        .get(new_column)
        .filter(|text| !text.trim().is_empty())
        .or_else(|| record.get(existing_column))
        .map(|text| text.trim().to_string())
}

/// Reduce a raw row to entry fields
#[must_use]
pub fn map_record(record: &RawRecord) -> EntryFields {
    EntryFields {
        file_name: record.get(columns::FILE_NAME).cloned(),
        path: record.get(columns::PATH_EN).cloned(),
        property_name: record.get(columns::PROPERTY_NAME).cloned(),
        component: record.get(columns::COMPONENT_EN).cloned(),
        en: pick_text(record, columns::NEW_EN, columns::EXISTING_EN),
        fr: pick_text(record, columns::NEW_FR, columns::EXISTING_FR),
    }
}

/// Data rows of `records` as entry fields
#[must_use]
pub fn records_to_entries(records: &[RawRecord]) -> Vec<EntryFields> {
    records
        .iter()
        .filter(|record| !is_marker_row(record))
        .map(map_record)
        .collect()
}

/// Extract every enabled workbook concurrently.
///
/// Returns one batch per workbook, in definition order.
pub async fn extract_all(sheets: &[SheetDef], extracts_dir: &Path, default_sheet: &str) -> Result<Vec<(SheetDef, Vec<EntryFields>)>> {
    let jobs = sheets.iter().filter(|def| !def.disabled).cloned().map(|def| {
        let dir = extracts_dir.to_path_buf();
        let default_sheet = default_sheet.to_string();
        async move {
            let task_def = def.clone();
            let entries = tokio::task::spawn_blocking(move || {
                read_sheet(&task_def, &dir, &default_sheet, None).map(|records| records_to_entries(&records))
            })
            .await
            .map_err(|e| ReviewError::Other(format!("Extraction task failed: {e}")))??;

            info!(sheet = %def.out_file, entries = entries.len(), "Extracted workbook");
            Ok::<_, ReviewError>((def, entries))
        }
    });

    try_join_all(jobs).await
}

/// The header row of a workbook, if it has one in its first two rows
pub fn read_header_row(def: &SheetDef, extracts_dir: &Path, default_sheet: &str) -> Result<Option<RawRecord>> {
    let records = read_sheet(def, extracts_dir, default_sheet, Some(2))?;
    Ok(records
        .into_iter()
        .find(|record| record.get(columns::VERSION).map(String::as_str) == Some(columns::VERSION)))
}
