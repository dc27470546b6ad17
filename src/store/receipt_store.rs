//! Receipt Store
//!
//! Past purchases with their line items. Receipts are created and deleted,
//! never edited; after a create the whole history is re-read.

use std::collections::HashMap;

use chrono::{Local, Utc};
use uuid::Uuid;

use super::Session;
use crate::checkout::default_title;
use crate::domain::{
    DomainResult, NewReceipt, NewReceiptItem, Receipt, ReceiptDraft, ReceiptItem,
    ReceiptWithItems,
};
use crate::repository::{Collection, Query};

pub struct ReceiptStore {
    session: Session,
    headers: Collection<Receipt>,
    lines: Collection<ReceiptItem>,
    receipts: Vec<ReceiptWithItems>,
}

impl ReceiptStore {
    pub fn new(session: Session) -> Self {
        Self {
            headers: session.collection(),
            lines: session.collection(),
            session,
            receipts: Vec::new(),
        }
    }

    /// Cached receipts, most recent purchase first
    pub fn receipts(&self) -> &[ReceiptWithItems] {
        &self.receipts
    }

    pub fn find(&self, receipt_id: Uuid) -> Option<&ReceiptWithItems> {
        self.receipts.iter().find(|r| r.receipt.id == receipt_id)
    }

    /// Re-read every receipt of the user together with its items.
    ///
    /// If the items cannot be read the headers are still shown, without items.
    pub async fn fetch(&mut self) -> DomainResult<&[ReceiptWithItems]> {
        let receipts = self
            .headers
            .find(&Query::new().eq("user_id", self.session.user_id).order_desc("purchase_date"))
            .await?;

        let receipt_ids: Vec<Uuid> = receipts.iter().map(|r| r.id).collect();
        let items = match self.lines.find(&Query::new().is_in("receipt_id", &receipt_ids)).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("Failed to fetch receipt items: {}", e);
                Vec::new()
            }
        };

        let mut by_receipt: HashMap<Uuid, Vec<ReceiptItem>> = HashMap::new();
        for item in items {
            by_receipt.entry(item.receipt_id).or_default().push(item);
        }

        self.receipts = receipts
            .into_iter()
            .map(|receipt| {
                let items = by_receipt.remove(&receipt.id).unwrap_or_default();
                ReceiptWithItems { receipt, items }
            })
            .collect();
        Ok(&self.receipts)
    }

    /// Write a receipt header and its lines.
    ///
    /// When the lines cannot be written the header is deleted again, so a
    /// receipt never exists without the lines it was created with.
    pub async fn create_receipt(&mut self, draft: ReceiptDraft) -> DomainResult<Receipt> {
        let purchase_date = draft.purchase_date.unwrap_or_else(Utc::now);
        let title = match draft.title.trim() {
            "" => default_title(purchase_date.with_timezone(&Local).date_naive()),
            title => title.to_string(),
        };
        let market = Some(draft.market.trim().to_string()).filter(|m| !m.is_empty());

        let header = self
            .headers
            .create(&NewReceipt {
                user_id: self.session.user_id,
                list_id: draft.list_id,
                title,
                total_amount: draft.total_amount,
                payment_method: draft.payment_method,
                has_discount: draft.has_discount,
                discount_amount: draft.discount_amount,
                market,
                purchase_date,
            })
            .await
            .map_err(|e| {
                log::error!("Failed to create receipt header: {}", e);
                e
            })?;

        let rows: Vec<NewReceiptItem> = draft
            .items
            .iter()
            .map(|line| NewReceiptItem::from_line(header.id, line))
            .collect();

        if let Err(e) = self.lines.create_many(&rows).await {
            log::error!("Failed to insert items of receipt {}, removing header: {}", header.id, e);
            if let Err(cleanup) = self.headers.delete_by_id(header.id).await {
                log::error!("Receipt {} left without items: {}", header.id, cleanup);
            }
            if let Err(refetch) = self.fetch().await {
                log::error!("Failed to refresh receipts: {}", refetch);
            }
            return Err(e);
        }

        log::info!("Created receipt {} with {} items", header.id, rows.len());
        self.fetch().await?;
        Ok(header)
    }

    pub async fn delete_receipt(&mut self, receipt_id: Uuid) -> DomainResult<()> {
        self.headers.delete_by_id(receipt_id).await?;
        self.receipts.retain(|r| r.receipt.id != receipt_id);
        Ok(())
    }
}
