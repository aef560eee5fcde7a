//! Column schema compiler.
//!
//! Administrators define tables as ordered column specifications; this
//! module derives each column's canonical validation pattern and compiles
//! the full set into a row validator used by the bulk-import pipeline.
//! Compilation is pure and deterministic: for every model other than
//! `comboBox` the pattern depends only on the model.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// National mobile numbers: `09` followed by nine digits.
pub const PHONE_NUMBER_PATTERN: &str = r"^09\d{9}$";

/// National landline numbers: `0` followed by ten digits.
pub const HOME_NUMBER_PATTERN: &str = r"^0\d{10}$";

/// Ten-digit national identity code.
pub const NATIONAL_CODE_PATTERN: &str = r"^\d{10}$";

/// Digits only.
pub const DECIMAL_PATTERN: &str = r"^[0-9]+$";

/// Persian-calendar dates: years 1300-1499, `YYYY/M/D` with valid
/// month/day ranges and optional leading zeroes.
pub const DATE_PATTERN: &str = r"^1[34][0-9][0-9]/(0?[1-9]|1[012])/(0?[1-9]|[12][0-9]|3[01])$";

/// The validation model of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnModel {
    FreeText,
    PhoneNumber,
    HomeNumber,
    NationalCode,
    ComboBox,
    Decimal,
    Date,
}

/// One administrator-defined column.
///
/// `pattern` is always derived from `(model, combo_box_values)` by
/// [`finalize_columns`]; whatever a client sends in that field is
/// discarded and recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    pub model: ColumnModel,
    pub nullable: bool,
    #[serde(default)]
    pub combo_box_values: Vec<String>,
    #[serde(default)]
    pub pattern: String,
}

/// Derive the canonical pattern for a column.
pub fn column_pattern(model: ColumnModel, combo_values: &[String]) -> String {
    match model {
        ColumnModel::FreeText => String::new(),
        ColumnModel::PhoneNumber => PHONE_NUMBER_PATTERN.to_string(),
        ColumnModel::HomeNumber => HOME_NUMBER_PATTERN.to_string(),
        ColumnModel::NationalCode => NATIONAL_CODE_PATTERN.to_string(),
        ColumnModel::Decimal => DECIMAL_PATTERN.to_string(),
        ColumnModel::Date => DATE_PATTERN.to_string(),
        ColumnModel::ComboBox => combo_pattern(combo_values),
    }
}

/// Anchored alternation matching exactly the listed literal values.
pub fn combo_pattern(values: &[String]) -> String {
    let alternatives: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
    format!("^(?:{})$", alternatives.join("|"))
}

/// Validate a submitted column set and stamp the derived patterns.
///
/// `combo_box_values` on any model other than `comboBox` is a caller
/// error and fails with `NoAccess`.
pub fn finalize_columns(mut specs: Vec<ColumnSpec>) -> Result<Vec<ColumnSpec>, CoreError> {
    for spec in &mut specs {
        if spec.model != ColumnModel::ComboBox && !spec.combo_box_values.is_empty() {
            return Err(CoreError::NoAccess);
        }
        spec.pattern = column_pattern(spec.model, &spec.combo_box_values);
    }
    Ok(specs)
}

/// A single cell-level validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct CellViolation {
    pub column: String,
    pub message: String,
}

struct CompiledColumn {
    name: String,
    nullable: bool,
    /// `None` for free text, which accepts anything.
    matcher: Option<Regex>,
}

/// A column set compiled into a reusable row validator.
///
/// Semantics mirror an object schema with `additionalProperties: false`
/// and `required` = the non-nullable column names: unknown keys are
/// rejected, non-nullable columns must be present and non-null, and
/// nullable columns accept null in addition to their typed pattern.
pub struct CompiledSchema {
    columns: Vec<CompiledColumn>,
}

impl CompiledSchema {
    /// Compile finalized specs. Patterns are derived, so a failure to
    /// parse one indicates corrupted stored data, not caller error.
    pub fn compile(specs: &[ColumnSpec]) -> Result<Self, CoreError> {
        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let matcher = if spec.pattern.is_empty() {
                None
            } else {
                Some(Regex::new(&spec.pattern).map_err(|e| {
                    CoreError::Internal(format!("stored pattern for '{}' is invalid: {e}", spec.name))
                })?)
            };
            columns.push(CompiledColumn {
                name: spec.name.clone(),
                nullable: spec.nullable,
                matcher,
            });
        }
        Ok(Self { columns })
    }

    /// Column names in definition order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Validate one row, returning every cell violation found.
    pub fn validate_row(&self, row: &serde_json::Map<String, Value>) -> Vec<CellViolation> {
        let mut violations = Vec::new();

        for key in row.keys() {
            if !self.columns.iter().any(|c| c.name == *key) {
                violations.push(CellViolation {
                    column: key.clone(),
                    message: "unknown column".to_string(),
                });
            }
        }

        for column in &self.columns {
            match row.get(&column.name) {
                None | Some(Value::Null) => {
                    if !column.nullable {
                        violations.push(CellViolation {
                            column: column.name.clone(),
                            message: "required value is missing".to_string(),
                        });
                    }
                }
                Some(Value::String(cell)) => {
                    if let Some(matcher) = &column.matcher {
                        if !matcher.is_match(cell) {
                            violations.push(CellViolation {
                                column: column.name.clone(),
                                message: "value does not match the expected format".to_string(),
                            });
                        }
                    }
                }
                Some(_) => {
                    violations.push(CellViolation {
                        column: column.name.clone(),
                        message: "value must be a string".to_string(),
                    });
                }
            }
        }

        violations
    }
}

/// Edit-safety check for reused table definitions.
///
/// Every baseline column must still be present in the replacement set
/// with identical name, model, nullability, pattern, and (for combo
/// boxes) identical ordered value list; otherwise previously-collected
/// data would become uninterpretable and the edit fails with
/// `UnexpectedData`.
pub fn is_missing_in_new(
    baseline: &[ColumnSpec],
    replacement: &[ColumnSpec],
) -> Result<(), CoreError> {
    for old in baseline {
        let retained = replacement.iter().any(|new| {
            new.name == old.name
                && new.model == old.model
                && new.nullable == old.nullable
                && new.pattern == old.pattern
                && new.combo_box_values == old.combo_box_values
        });
        if !retained {
            return Err(CoreError::UnexpectedData(format!(
                "column '{}' was removed or altered",
                old.name
            )));
        }
    }
    Ok(())
}

/// A column as exposed to schema consumers: the validation model is
/// collapsed to a display-only type and the canonical pattern is never
/// included.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayColumn {
    pub name: String,
    pub model: &'static str,
}

/// Collapse the internal models for external consumption: every
/// string-like model surfaces as `"string"`; decimal and date stay
/// distinct.
pub fn display_columns(specs: &[ColumnSpec]) -> Vec<DisplayColumn> {
    specs
        .iter()
        .map(|spec| DisplayColumn {
            name: spec.name.clone(),
            model: match spec.model {
                ColumnModel::Decimal => "decimal",
                ColumnModel::Date => "date",
                ColumnModel::FreeText
                | ColumnModel::PhoneNumber
                | ColumnModel::HomeNumber
                | ColumnModel::NationalCode
                | ColumnModel::ComboBox => "string",
            },
        })
        .collect()
}
