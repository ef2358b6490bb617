// src/query.rs
//! Read-only views over the served snapshot: borrower list, detail and history table
use crate::cache::DatasetCache;
use crate::constants::{self as c};
use crate::error::ServiceError;
use crate::index::{RecordRow, Snapshot};
use serde::Serialize;
use serde::ser::{SerializeTuple, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Latest-row projection for one borrower, plus every installment label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorrowerDetail {
    #[serde(rename = "idAplikasi", skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(rename = "uidCollection", skip_serializing_if = "Option::is_none")]
    pub collection_uid: Option<String>,
    #[serde(rename = "overdueSekarang", skip_serializing_if = "Option::is_none")]
    pub overdue_now: Option<String>,
    #[serde(rename = "angsuran", skip_serializing_if = "Option::is_none")]
    pub installment: Option<String>,
    #[serde(rename = "totalOverdue", skip_serializing_if = "Option::is_none")]
    pub total_overdue: Option<String>,
    #[serde(rename = "osPrincipal", skip_serializing_if = "Option::is_none")]
    pub outstanding_principal: Option<String>,
    #[serde(rename = "debiturStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "angsuranKe")]
    pub installment_labels: Vec<String>,
}

/// One history line, serialized as a positional JSON array
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub installment_label: Option<String>,
    pub collection_uid: Option<String>,
    pub installment: Option<String>,
    pub total_overdue: Option<String>,
    pub outstanding_principal: Option<String>,
    pub overdue_now: f64,
    pub status: Option<String>,
}

impl Serialize for HistoryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(7)?;
        tuple.serialize_element(&self.installment_label)?;
        tuple.serialize_element(&self.collection_uid)?;
        tuple.serialize_element(&self.installment)?;
        tuple.serialize_element(&self.total_overdue)?;
        tuple.serialize_element(&self.outstanding_principal)?;
        // Whole numbers go out as integers (`12`, not `12.0`)
        if self.overdue_now.fract() == 0.0 && self.overdue_now.abs() < 9_007_199_254_740_992.0 {
            tuple.serialize_element(&(self.overdue_now as i64))?;
        } else {
            tuple.serialize_element(&self.overdue_now)?;
        }
        tuple.serialize_element(&self.status)?;
        tuple.end()
    }
}

/// Numeric value of an overdue cell; blank, absent or non-numeric is 0
pub fn parse_amount(cell: Option<&str>) -> f64 {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn owned(row: &RecordRow, col: usize) -> Option<String> {
    row.cell(col).map(str::to_string)
}

/// Distinct borrower names outside the excluded category, sorted
pub fn list_borrowers(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .rows()
        .iter()
        .filter(|row| row.category() != Some(c::EXCLUDED_CATEGORY))
        .filter_map(RecordRow::borrower_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn require_name(name: Option<&str>) -> Result<&str, ServiceError> {
    match name {
        Some(n) if !n.is_empty() => Ok(n),
        _ => Err(ServiceError::bad_request("Debitur name is required")),
    }
}

fn borrower_rows<'a>(snapshot: &'a Snapshot, name: &str) -> Result<Vec<&'a RecordRow>, ServiceError> {
    let rows = snapshot.rows_for(name);
    if rows.is_empty() {
        return Err(ServiceError::not_found("Debitur not found"));
    }
    Ok(rows)
}

pub fn borrower_detail(snapshot: &Snapshot, name: &str) -> Result<BorrowerDetail, ServiceError> {
    let rows = borrower_rows(snapshot, name)?;
    let last = rows[rows.len() - 1];

    Ok(BorrowerDetail {
        application_id: owned(last, c::COL_APPLICATION_ID),
        collection_uid: owned(last, c::COL_COLLECTION_UID),
        overdue_now: owned(last, c::COL_OVERDUE_NOW),
        installment: owned(last, c::COL_INSTALLMENT),
        total_overdue: owned(last, c::COL_TOTAL_OVERDUE),
        outstanding_principal: owned(last, c::COL_OS_PRINCIPAL),
        status: owned(last, c::COL_STATUS),
        installment_labels: rows
            .iter()
            .filter_map(|row| row.non_empty(c::COL_INSTALLMENT_LABEL))
            .map(str::to_string)
            .collect(),
    })
}

pub fn borrower_history(snapshot: &Snapshot, name: &str) -> Result<Vec<HistoryRow>, ServiceError> {
    let rows = borrower_rows(snapshot, name)?;
    Ok(rows
        .into_iter()
        .map(|row| HistoryRow {
            installment_label: owned(row, c::COL_INSTALLMENT_LABEL),
            collection_uid: owned(row, c::COL_COLLECTION_UID),
            installment: owned(row, c::COL_INSTALLMENT),
            total_overdue: owned(row, c::COL_TOTAL_OVERDUE),
            outstanding_principal: owned(row, c::COL_OS_PRINCIPAL),
            overdue_now: parse_amount(row.cell(c::COL_OVERDUE_NOW)),
            status: owned(row, c::COL_STATUS),
        })
        .collect())
}

/// Query entry point used by the HTTP handlers.
///
/// Every call loads the snapshot exactly once, so a single answer never mixes
/// generations.
#[derive(Clone)]
pub struct QueryService {
    cache: Arc<DatasetCache>,
}

impl QueryService {
    pub fn new(cache: Arc<DatasetCache>) -> Self {
        Self { cache }
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>, ServiceError> {
        self.cache.current().ok_or(ServiceError::NotReady)
    }

    pub fn list_borrowers(&self) -> Result<Vec<String>, ServiceError> {
        let snapshot = self.snapshot()?;
        Ok(list_borrowers(&snapshot))
    }

    pub fn borrower_detail(&self, name: Option<&str>) -> Result<BorrowerDetail, ServiceError> {
        let name = require_name(name)?;
        let snapshot = self
            .cache
            .current()
            .ok_or_else(|| ServiceError::not_found("Debitur not found"))?;
        borrower_detail(&snapshot, name)
    }

    pub fn borrower_history(&self, name: Option<&str>) -> Result<Vec<HistoryRow>, ServiceError> {
        let name = require_name(name)?;
        let snapshot = self
            .cache
            .current()
            .ok_or_else(|| ServiceError::not_found("Debitur not found"))?;
        borrower_history(&snapshot, name)
    }
}
