//! Checkout
//!
//! Turns the priced items of the active list into a receipt.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainResult, Receipt, ReceiptDraft, ReceiptLine, ShoppingItem};
use crate::store::{ListStore, ReceiptStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Credit,
    Debit,
    Cash,
    /// Meal voucher
    Vr,
    /// Food voucher
    Va,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Pix,
        PaymentMethod::Credit,
        PaymentMethod::Debit,
        PaymentMethod::Cash,
        PaymentMethod::Vr,
        PaymentMethod::Va,
    ];

    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Vr => "vr",
            PaymentMethod::Va => "va",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Credit => "Cartão de Crédito",
            PaymentMethod::Debit => "Cartão de Débito",
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::Vr => "VR",
            PaymentMethod::Va => "VA",
        }
    }

    pub fn is_voucher(&self) -> bool {
        matches!(self, PaymentMethod::Vr | PaymentMethod::Va)
    }
}

/// Voucher card issuers
pub const CARD_BRANDS: [&str; 5] = ["Pluxee", "Alelo", "Flash", "Ticket", "VR"];

/// What the user fills in at checkout
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutForm {
    pub title: String,
    pub payment_method: Option<PaymentMethod>,
    /// Only meaningful for voucher payments
    pub card_brand: Option<String>,
    /// Typed total; blank or unparseable falls back to the subtotal
    pub total_amount: String,
    pub has_discount: bool,
    pub discount_amount: String,
    pub market: String,
}

/// `Compra dd/mm/aaaa`
pub fn default_title(date: NaiveDate) -> String {
    format!("Compra {}", date.format("%d/%m/%Y"))
}

/// Parse a typed amount, accepting a decimal comma
fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount != 0.0)
}

impl CheckoutForm {
    pub fn new(subtotal: f64) -> Self {
        Self::for_date(subtotal, Local::now().date_naive())
    }

    pub fn for_date(subtotal: f64, date: NaiveDate) -> Self {
        Self {
            title: default_title(date),
            payment_method: None,
            card_brand: None,
            total_amount: subtotal.to_string(),
            has_discount: false,
            discount_amount: String::new(),
            market: String::new(),
        }
    }

    /// Pick a payment method; non-voucher methods drop the card brand
    pub fn select_payment(&mut self, method: PaymentMethod) {
        self.payment_method = Some(method);
        if !method.is_voucher() {
            self.card_brand = None;
        }
    }

    /// Stored payment label, e.g. `"VR - Pluxee"` for a branded voucher
    pub fn payment_label(&self) -> String {
        let Some(method) = self.payment_method else {
            return String::new();
        };
        match self.card_brand.as_deref().filter(|brand| !brand.is_empty()) {
            Some(brand) if method.is_voucher() => {
                format!("{} - {}", method.as_str().to_uppercase(), brand)
            }
            _ => method.as_str().to_string(),
        }
    }

    pub fn resolved_total(&self, subtotal: f64) -> f64 {
        parse_amount(&self.total_amount).unwrap_or(subtotal)
    }

    pub fn resolved_discount(&self) -> f64 {
        parse_amount(&self.discount_amount).unwrap_or(0.0)
    }

    /// Receipt for the given priced items
    pub fn to_draft(&self, items: &[ShoppingItem], subtotal: f64, list_id: Option<uuid::Uuid>) -> ReceiptDraft {
        let lines = items
            .iter()
            .filter_map(|item| {
                item.unit_price
                    .map(|price| ReceiptLine::new(item.name.clone(), f64::from(item.quantity), price))
            })
            .collect();

        ReceiptDraft {
            title: self.title.clone(),
            total_amount: self.resolved_total(subtotal),
            payment_method: self.payment_label(),
            has_discount: self.has_discount,
            discount_amount: self.resolved_discount(),
            market: self.market.clone(),
            items: lines,
            list_id,
            purchase_date: None,
        }
    }
}

/// Record the active list's priced items as a receipt
pub async fn checkout(form: &CheckoutForm, list: &ListStore, receipts: &mut ReceiptStore) -> DomainResult<Receipt> {
    let subtotal = list.calculate_subtotal();
    let items = list.items_with_price();
    let draft = form.to_draft(&items, subtotal, list.current_list().map(|l| l.id));

    log::info!("Checkout of {} priced items, subtotal {:.2}", items.len(), subtotal);
    receipts.create_receipt(draft).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::repository::SqliteStore;
    use crate::store::Session;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_default_title() {
        assert_eq!(CheckoutForm::for_date(10.0, date()).title, "Compra 07/03/2025");
    }

    #[test]
    fn test_voucher_label_includes_brand() {
        let mut form = CheckoutForm::for_date(10.0, date());
        form.select_payment(PaymentMethod::Vr);
        form.card_brand = Some("Pluxee".to_string());
        assert_eq!(form.payment_label(), "VR - Pluxee");

        form.select_payment(PaymentMethod::Pix);
        assert_eq!(form.card_brand, None);
        assert_eq!(form.payment_label(), "pix");
    }

    #[test]
    fn test_voucher_without_brand() {
        let mut form = CheckoutForm::for_date(10.0, date());
        form.select_payment(PaymentMethod::Va);
        assert_eq!(form.payment_label(), "va");
    }

    #[test]
    fn test_blank_total_uses_subtotal() {
        let mut form = CheckoutForm::for_date(52.3, date());
        form.total_amount = "  ".to_string();
        assert_eq!(form.resolved_total(52.3), 52.3);

        form.total_amount = "49,90".to_string();
        assert_eq!(form.resolved_total(52.3), 49.9);
        assert_eq!(form.resolved_discount(), 0.0);
    }

    #[tokio::test]
    async fn test_checkout_records_priced_items() {
        let session = Session::new(Uuid::new_v4(), Arc::new(SqliteStore::in_memory().unwrap()));
        let mut list = ListStore::new(session.clone());
        let mut receipts = ReceiptStore::new(session);

        list.create_custom_list("Feira").await.unwrap();
        let category_id = list.categories()[0].id();
        let arroz = list.add_item(category_id, "Arroz", 2).await.unwrap();
        list.add_item(category_id, "Sal", 1).await.unwrap();
        list.update_price(arroz.id, 25.9, None).await.unwrap();

        let mut form = CheckoutForm::new(list.calculate_subtotal());
        form.select_payment(PaymentMethod::Debit);
        let receipt = checkout(&form, &list, &mut receipts).await.unwrap();

        assert_eq!(receipt.list_id, list.current_list().map(|l| l.id));
        assert_eq!(receipt.payment_method.as_deref(), Some("debit"));
        assert!((receipt.total_amount - 51.8).abs() < 1e-9);
        let stored = receipts.find(receipt.id).unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].name, "Arroz");
        assert!((stored.items[0].total_price - 51.8).abs() < 1e-9);
    }
}
