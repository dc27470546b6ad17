//! Scan Staging
//!
//! The model's guess becomes an editable copy. Edits to quantity or unit
//! price recompute the line total and the receipt total; the model's own total
//! only seeds the first value.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use super::client::ScanAdapter;
use super::image::ReceiptImage;
use super::ScannedReceipt;
use crate::domain::{DomainError, DomainResult, Receipt, ReceiptDraft, ReceiptLine};
use crate::store::ReceiptStore;

/// Payment label used when the receipt did not show one
pub const UNKNOWN_PAYMENT: &str = "Não identificado";

/// Editable receipt awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct StagedReceipt {
    pub items: Vec<ReceiptLine>,
    pub total_amount: f64,
    pub market: Option<String>,
    pub payment_method: Option<String>,
    pub purchase_date: Option<NaiveDate>,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Edited amounts never go below zero
fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StagedReceipt {
    pub fn from_scan(scan: ScannedReceipt) -> Self {
        let items: Vec<ReceiptLine> = scan
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                let quantity = finite_or_zero(item.quantity.unwrap_or(1.0));
                let unit_price = finite_or_zero(item.unit_price.unwrap_or(0.0));
                ReceiptLine {
                    name: item.name.unwrap_or_default().trim().to_string(),
                    quantity,
                    unit_price,
                    total_price: item
                        .total_price
                        .map(finite_or_zero)
                        .unwrap_or(quantity * unit_price),
                }
            })
            .collect();

        let line_sum: f64 = items.iter().map(|line| line.total_price).sum();
        Self {
            total_amount: scan.total_amount.map(finite_or_zero).unwrap_or(line_sum),
            market: non_blank(scan.market),
            payment_method: non_blank(scan.payment_method),
            purchase_date: scan
                .purchase_date
                .and_then(|date| NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()),
            items,
        }
    }

    fn line_mut(&mut self, index: usize) -> DomainResult<&mut ReceiptLine> {
        self.items
            .get_mut(index)
            .ok_or_else(|| DomainError::InvalidInput(format!("Item {} não existe", index)))
    }

    fn recompute_total(&mut self) {
        self.total_amount = self.items.iter().map(|line| line.total_price).sum();
    }

    pub fn set_name(&mut self, index: usize, name: &str) -> DomainResult<()> {
        self.line_mut(index)?.name = name.to_string();
        Ok(())
    }

    pub fn set_quantity(&mut self, index: usize, quantity: f64) -> DomainResult<()> {
        let line = self.line_mut(index)?;
        line.quantity = non_negative(quantity);
        line.total_price = line.quantity * line.unit_price;
        self.recompute_total();
        Ok(())
    }

    pub fn set_unit_price(&mut self, index: usize, unit_price: f64) -> DomainResult<()> {
        let line = self.line_mut(index)?;
        line.unit_price = non_negative(unit_price);
        line.total_price = line.quantity * line.unit_price;
        self.recompute_total();
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> DomainResult<()> {
        if index >= self.items.len() {
            return Err(DomainError::InvalidInput(format!("Item {} não existe", index)));
        }
        self.items.remove(index);
        self.recompute_total();
        Ok(())
    }

    /// Manual override of the receipt total
    pub fn set_total(&mut self, total_amount: f64) {
        self.total_amount = non_negative(total_amount);
    }

    fn purchase_timestamp(&self) -> Option<DateTime<Utc>> {
        self.purchase_date
            .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
    }

    /// Receipt to create; `today` names receipts without a market
    pub fn to_draft(&self, today: NaiveDate) -> ReceiptDraft {
        let title = match &self.market {
            Some(market) => format!("Compra - {}", market),
            None => format!("Compra escaneada - {}", today.format("%d/%m/%Y")),
        };

        ReceiptDraft {
            title,
            total_amount: self.total_amount,
            payment_method: self
                .payment_method
                .clone()
                .unwrap_or_else(|| UNKNOWN_PAYMENT.to_string()),
            has_discount: false,
            discount_amount: 0.0,
            market: self.market.clone().unwrap_or_default(),
            items: self.items.clone(),
            list_id: None,
            purchase_date: self.purchase_timestamp(),
        }
    }
}

/// Where the scanner screen is
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPhase {
    /// Waiting for a photo
    Capture,
    /// Photo sent, waiting for the model
    Processing,
    Editing(StagedReceipt),
}

/// Capture -> scan -> edit -> commit
pub struct ScanWorkflow<S: ScanAdapter> {
    adapter: S,
    phase: ScanPhase,
}

impl<S: ScanAdapter> ScanWorkflow<S> {
    pub fn new(adapter: S) -> Self {
        Self {
            adapter,
            phase: ScanPhase::Capture,
        }
    }

    pub fn phase(&self) -> &ScanPhase {
        &self.phase
    }

    pub fn staged(&self) -> Option<&StagedReceipt> {
        match &self.phase {
            ScanPhase::Editing(staged) => Some(staged),
            _ => None,
        }
    }

    pub fn staged_mut(&mut self) -> Option<&mut StagedReceipt> {
        match &mut self.phase {
            ScanPhase::Editing(staged) => Some(staged),
            _ => None,
        }
    }

    /// Send one image to the model. Any failure discards it and returns to capture.
    pub async fn submit(&mut self, image: ReceiptImage) -> DomainResult<&StagedReceipt> {
        self.phase = ScanPhase::Processing;

        match self.adapter.scan(&image).await {
            Ok(scanned) => {
                let staged = StagedReceipt::from_scan(scanned);
                log::info!("Staged scanned receipt with {} items", staged.items.len());
                self.phase = ScanPhase::Editing(staged);
                self.staged()
                    .ok_or_else(|| DomainError::Internal("scan staging lost".to_string()))
            }
            Err(e) => {
                log::error!("Receipt scan failed: {}", e);
                self.phase = ScanPhase::Capture;
                Err(e)
            }
        }
    }

    /// Create the staged receipt and clear staging. A failed create keeps
    /// the staged copy so it can be retried.
    pub async fn commit(&mut self, receipts: &mut ReceiptStore) -> DomainResult<Receipt> {
        let draft = match &self.phase {
            ScanPhase::Editing(staged) => staged.to_draft(Local::now().date_naive()),
            _ => return Err(DomainError::InvalidInput("Nenhuma nota para salvar".to_string())),
        };

        let receipt = receipts.create_receipt(draft).await?;
        self.phase = ScanPhase::Capture;
        Ok(receipt)
    }

    /// Drop whatever is staged
    pub fn reset(&mut self) {
        self.phase = ScanPhase::Capture;
    }
}
