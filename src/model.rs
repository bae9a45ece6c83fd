//! Submission data types and file types
//!
//! A [`DataType`] groups the files a project submits for one kind of data
//! (clinical donors, simple somatic mutations, ...). Every [`FileType`]
//! belongs to exactly one data type and names the dictionary schema that
//! describes it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {name}")]
pub struct UnknownTypeError {
    pub kind: &'static str,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Donor,
    Specimen,
    Sample,
    Biomarker,
    Family,
    Exposure,
    Surgery,
    Therapy,
    Ssm,
    Cnsm,
    Stsm,
    Sgv,
    Cngv,
    Stgv,
    Pexp,
    MethArray,
    MethSeq,
    MirnaSeq,
    Jcn,
    ExpArray,
    ExpSeq,
}

impl DataType {
    pub const ALL: [DataType; 21] = [
        DataType::Donor,
        DataType::Specimen,
        DataType::Sample,
        DataType::Biomarker,
        DataType::Family,
        DataType::Exposure,
        DataType::Surgery,
        DataType::Therapy,
        DataType::Ssm,
        DataType::Cnsm,
        DataType::Stsm,
        DataType::Sgv,
        DataType::Cngv,
        DataType::Stgv,
        DataType::Pexp,
        DataType::MethArray,
        DataType::MethSeq,
        DataType::MirnaSeq,
        DataType::Jcn,
        DataType::ExpArray,
        DataType::ExpSeq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataType::Donor => "DONOR",
            DataType::Specimen => "SPECIMEN",
            DataType::Sample => "SAMPLE",
            DataType::Biomarker => "BIOMARKER",
            DataType::Family => "FAMILY",
            DataType::Exposure => "EXPOSURE",
            DataType::Surgery => "SURGERY",
            DataType::Therapy => "THERAPY",
            DataType::Ssm => "SSM",
            DataType::Cnsm => "CNSM",
            DataType::Stsm => "STSM",
            DataType::Sgv => "SGV",
            DataType::Cngv => "CNGV",
            DataType::Stgv => "STGV",
            DataType::Pexp => "PEXP",
            DataType::MethArray => "METH_ARRAY",
            DataType::MethSeq => "METH_SEQ",
            DataType::MirnaSeq => "MIRNA_SEQ",
            DataType::Jcn => "JCN",
            DataType::ExpArray => "EXP_ARRAY",
            DataType::ExpSeq => "EXP_SEQ",
        }
    }

    pub fn is_clinical(self) -> bool {
        matches!(
            self,
            DataType::Donor
                | DataType::Specimen
                | DataType::Sample
                | DataType::Biomarker
                | DataType::Family
                | DataType::Exposure
                | DataType::Surgery
                | DataType::Therapy
        )
    }

    /// Expands a queued selection: an empty selection stands for every data type.
    pub fn resolve_selection(selected: &[DataType]) -> Vec<DataType> {
        if selected.is_empty() {
            DataType::ALL.to_vec()
        } else {
            let mut resolved = selected.to_vec();
            resolved.sort();
            resolved.dedup();
            resolved
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownTypeError {
                kind: "data type",
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    Donor,
    Specimen,
    Sample,
    Biomarker,
    Family,
    Exposure,
    Surgery,
    Therapy,
    SsmM,
    SsmP,
    SsmS,
    CnsmM,
    CnsmP,
    CnsmS,
    StsmM,
    StsmP,
    StsmS,
    SgvM,
    SgvP,
    SgvS,
    CngvM,
    CngvP,
    CngvS,
    StgvM,
    StgvP,
    StgvS,
    PexpM,
    PexpP,
    MethArrayM,
    MethArrayProbes,
    MethArrayP,
    MethSeqM,
    MethSeqP,
    MirnaSeqM,
    MirnaSeqP,
    JcnM,
    JcnP,
    ExpArrayM,
    ExpArrayP,
    ExpSeqM,
    ExpSeqP,
}

impl FileType {
    pub const ALL: [FileType; 41] = [
        FileType::Donor,
        FileType::Specimen,
        FileType::Sample,
        FileType::Biomarker,
        FileType::Family,
        FileType::Exposure,
        FileType::Surgery,
        FileType::Therapy,
        FileType::SsmM,
        FileType::SsmP,
        FileType::SsmS,
        FileType::CnsmM,
        FileType::CnsmP,
        FileType::CnsmS,
        FileType::StsmM,
        FileType::StsmP,
        FileType::StsmS,
        FileType::SgvM,
        FileType::SgvP,
        FileType::SgvS,
        FileType::CngvM,
        FileType::CngvP,
        FileType::CngvS,
        FileType::StgvM,
        FileType::StgvP,
        FileType::StgvS,
        FileType::PexpM,
        FileType::PexpP,
        FileType::MethArrayM,
        FileType::MethArrayProbes,
        FileType::MethArrayP,
        FileType::MethSeqM,
        FileType::MethSeqP,
        FileType::MirnaSeqM,
        FileType::MirnaSeqP,
        FileType::JcnM,
        FileType::JcnP,
        FileType::ExpArrayM,
        FileType::ExpArrayP,
        FileType::ExpSeqM,
        FileType::ExpSeqP,
    ];

    /// Data type this file type belongs to, and the dictionary schema name describing it
    fn descriptor(self) -> (DataType, &'static str) {
        match self {
            FileType::Donor => (DataType::Donor, "donor"),
            FileType::Specimen => (DataType::Specimen, "specimen"),
            FileType::Sample => (DataType::Sample, "sample"),
            FileType::Biomarker => (DataType::Biomarker, "biomarker"),
            FileType::Family => (DataType::Family, "family"),
            FileType::Exposure => (DataType::Exposure, "exposure"),
            FileType::Surgery => (DataType::Surgery, "surgery"),
            FileType::Therapy => (DataType::Therapy, "therapy"),
            FileType::SsmM => (DataType::Ssm, "ssm_m"),
            FileType::SsmP => (DataType::Ssm, "ssm_p"),
            FileType::SsmS => (DataType::Ssm, "ssm_s"),
            FileType::CnsmM => (DataType::Cnsm, "cnsm_m"),
            FileType::CnsmP => (DataType::Cnsm, "cnsm_p"),
            FileType::CnsmS => (DataType::Cnsm, "cnsm_s"),
            FileType::StsmM => (DataType::Stsm, "stsm_m"),
            FileType::StsmP => (DataType::Stsm, "stsm_p"),
            FileType::StsmS => (DataType::Stsm, "stsm_s"),
            FileType::SgvM => (DataType::Sgv, "sgv_m"),
            FileType::SgvP => (DataType::Sgv, "sgv_p"),
            FileType::SgvS => (DataType::Sgv, "sgv_s"),
            FileType::CngvM => (DataType::Cngv, "cngv_m"),
            FileType::CngvP => (DataType::Cngv, "cngv_p"),
            FileType::CngvS => (DataType::Cngv, "cngv_s"),
            FileType::StgvM => (DataType::Stgv, "stgv_m"),
            FileType::StgvP => (DataType::Stgv, "stgv_p"),
            FileType::StgvS => (DataType::Stgv, "stgv_s"),
            FileType::PexpM => (DataType::Pexp, "pexp_m"),
            FileType::PexpP => (DataType::Pexp, "pexp_p"),
            FileType::MethArrayM => (DataType::MethArray, "meth_array_m"),
            FileType::MethArrayProbes => (DataType::MethArray, "meth_array_probes"),
            FileType::MethArrayP => (DataType::MethArray, "meth_array_p"),
            FileType::MethSeqM => (DataType::MethSeq, "meth_seq_m"),
            FileType::MethSeqP => (DataType::MethSeq, "meth_seq_p"),
            FileType::MirnaSeqM => (DataType::MirnaSeq, "mirna_seq_m"),
            FileType::MirnaSeqP => (DataType::MirnaSeq, "mirna_seq_p"),
            FileType::JcnM => (DataType::Jcn, "jcn_m"),
            FileType::JcnP => (DataType::Jcn, "jcn_p"),
            FileType::ExpArrayM => (DataType::ExpArray, "exp_array_m"),
            FileType::ExpArrayP => (DataType::ExpArray, "exp_array_p"),
            FileType::ExpSeqM => (DataType::ExpSeq, "exp_seq_m"),
            FileType::ExpSeqP => (DataType::ExpSeq, "exp_seq_p"),
        }
    }

    pub fn data_type(self) -> DataType {
        self.descriptor().0
    }

    pub fn schema_name(self) -> &'static str {
        self.descriptor().1
    }

    pub fn from_schema_name(name: &str) -> Option<FileType> {
        FileType::ALL
            .into_iter()
            .find(|file_type| file_type.schema_name() == name)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

impl FromStr for FileType {
    type Err = UnknownTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileType::from_schema_name(&s.trim().to_ascii_lowercase()).ok_or_else(|| {
            UnknownTypeError {
                kind: "file type",
                name: s.to_string(),
            }
        })
    }
}
