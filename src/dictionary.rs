//! Dictionary file schemas and submission file classification

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DictionaryError, DictionaryResult};
use crate::model::FileType;

/// Extension of every file a submission is expected to contain
pub const FILE_EXTENSION: &str = ".txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSchema {
    pub name: String,
    /// Regular expression a submitted file name must match
    pub pattern: String,
    pub file_type: FileType,
    #[serde(default)]
    pub required: bool,
}

impl FileSchema {
    pub fn new(file_type: FileType, pattern: impl Into<String>) -> Self {
        Self {
            name: file_type.schema_name().to_string(),
            pattern: pattern.into(),
            file_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// File name used when reporting on a schema that has no file
    pub fn placeholder_file_name(&self) -> String {
        format!("{}{}", self.name, FILE_EXTENSION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dictionary {
    pub version: String,
    pub schemas: Vec<FileSchema>,
}

/// How a set of submitted file names maps onto a dictionary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Every file matched by exactly one schema's pattern, keyed by file name
    pub files: BTreeMap<String, FileType>,
    /// Matched file names per schema name
    pub matched: BTreeMap<String, Vec<String>>,
    /// Schemas matched by more than one file
    pub conflicts: BTreeMap<String, Vec<String>>,
    /// Required schemas without any matching file
    pub missing: Vec<String>,
    /// Files no schema recognizes
    pub unmatched: Vec<String>,
}

impl Classification {
    /// A submission missing a required file cannot be validated at all.
    pub fn is_malformed(&self) -> bool {
        !self.missing.is_empty()
    }
}

impl Dictionary {
    pub async fn load(path: &Path) -> DictionaryResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn schema(&self, name: &str) -> DictionaryResult<&FileSchema> {
        self.schemas
            .iter()
            .find(|schema| schema.name == name)
            .ok_or_else(|| DictionaryError::UnknownSchema {
                name: name.to_string(),
            })
    }

    pub fn classify<S: AsRef<str>>(&self, file_names: &[S]) -> DictionaryResult<Classification> {
        let compiled = self
            .schemas
            .iter()
            .map(|schema| {
                Regex::new(&schema.pattern)
                    .map(|regex| (schema, regex))
                    .map_err(|source| DictionaryError::InvalidPattern {
                        schema: schema.name.clone(),
                        source,
                    })
            })
            .collect::<DictionaryResult<Vec<_>>>()?;

        let mut classification = Classification::default();
        for file_name in file_names {
            let file_name = file_name.as_ref();
            match compiled.iter().find(|(_, regex)| regex.is_match(file_name)) {
                Some((schema, _)) => {
                    classification
                        .matched
                        .entry(schema.name.clone())
                        .or_default()
                        .push(file_name.to_string());
                    classification
                        .files
                        .insert(file_name.to_string(), schema.file_type);
                }
                None => classification.unmatched.push(file_name.to_string()),
            }
        }

        for (schema, _) in &compiled {
            match classification.matched.get_mut(&schema.name) {
                Some(files) if files.len() > 1 => {
                    files.sort();
                    classification
                        .conflicts
                        .insert(schema.name.clone(), files.clone());
                }
                Some(_) => {}
                None if schema.required => classification.missing.push(schema.name.clone()),
                None => {}
            }
        }

        Ok(classification)
    }
}
