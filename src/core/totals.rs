use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::EbiError;
use super::types::*;

/// Calculate line amounts, VAT breakdown and document totals in place.
///
/// Tax is computed per (category, rate) group on the summed taxable base,
/// not per line, so rounding differences between lines do not accumulate.
/// Fails with [`EbiError::AmountOverflow`] if an intermediate amount leaves
/// the range of `Decimal`; `invoice.totals` is left untouched then.
pub fn calculate_totals(invoice: &mut Invoice, prepaid: Decimal) -> Result<(), EbiError> {
    for line in &mut invoice.lines {
        let amount = line
            .quantity
            .checked_mul(line.unit_price)
            .ok_or_else(|| overflow(format!("line {}: quantity times unit price", line.id)))?;
        line.line_amount = Some(round_half_up(amount, 2));
    }

    let line_net_total = checked_sum(
        invoice.lines.iter().filter_map(|l| l.line_amount),
        "sum of line amounts",
    )?;

    // Keyed by (category code, rate) so the breakdown comes out sorted.
    let mut groups: BTreeMap<(&'static str, Decimal), (TaxCategory, Decimal)> = BTreeMap::new();
    for line in &invoice.lines {
        let entry = groups
            .entry((line.tax_category.code(), line.tax_rate.normalize()))
            .or_insert((line.tax_category, Decimal::ZERO));
        entry.1 = entry
            .1
            .checked_add(line.line_amount.unwrap_or(Decimal::ZERO))
            .ok_or_else(|| overflow("taxable amount".into()))?;
    }

    let mut vat_total = Decimal::ZERO;
    let mut vat_breakdown = Vec::with_capacity(groups.len());
    for ((_, rate), (category, taxable_amount)) in groups {
        let tax_amount = taxable_amount
            .checked_mul(rate)
            .and_then(|v| v.checked_div(dec!(100)))
            .map(|v| round_half_up(v, 2))
            .ok_or_else(|| overflow(format!("tax amount at {rate} %")))?;
        vat_total = vat_total
            .checked_add(tax_amount)
            .ok_or_else(|| overflow("VAT total".into()))?;
        vat_breakdown.push(VatBreakdown {
            category,
            rate,
            taxable_amount,
            tax_amount,
            exemption_reason_code: category.exemption_reason_code().map(String::from),
        });
    }

    let gross_total = line_net_total
        .checked_add(vat_total)
        .ok_or_else(|| overflow("gross total".into()))?;
    let amount_due = gross_total
        .checked_sub(prepaid)
        .ok_or_else(|| overflow("amount due".into()))?;

    invoice.totals = Some(Totals {
        line_net_total,
        net_total: line_net_total,
        vat_total,
        gross_total,
        prepaid,
        amount_due,
        vat_breakdown,
    });
    Ok(())
}

/// Sum that reports overflow instead of panicking.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>, what: &str) -> Result<Decimal, EbiError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflow(what.to_string()))
}

fn overflow(what: String) -> EbiError {
    EbiError::AmountOverflow(what)
}

/// Commercial rounding (half away from zero).
pub(crate) fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn party(name: &str) -> Party {
        Party {
            name: name.into(),
            vat_id: None,
            identifier: None,
            address: Address {
                street: None,
                city: "Wien".into(),
                postal_code: "1010".into(),
                country_code: "AT".into(),
            },
            contact: None,
            electronic_address: None,
        }
    }

    fn line(id: &str, qty: Decimal, price: Decimal, category: TaxCategory, rate: Decimal) -> LineItem {
        LineItem {
            id: id.into(),
            quantity: qty,
            unit: "C62".into(),
            unit_price: price,
            tax_category: category,
            tax_rate: rate,
            item_name: format!("Item {id}"),
            description: None,
            seller_item_id: None,
            line_amount: None,
        }
    }

    fn invoice(lines: Vec<LineItem>) -> Invoice {
        Invoice {
            number: "R-1".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: None,
            type_code: InvoiceTypeCode::Invoice,
            currency_code: "EUR".into(),
            notes: Vec::new(),
            buyer_reference: None,
            order_reference: None,
            seller: party("Seller"),
            buyer: party("Buyer"),
            lines,
            totals: None,
            payment_terms: None,
            payment: None,
            delivery_date: None,
            invoicing_period: None,
        }
    }

    #[test]
    fn groups_by_category_and_rate() {
        let mut inv = invoice(vec![
            line("1", dec!(2), dec!(100), TaxCategory::StandardRate, dec!(20)),
            line("2", dec!(1), dec!(50), TaxCategory::StandardRate, dec!(10)),
            line("3", dec!(3), dec!(10), TaxCategory::StandardRate, dec!(20.00)),
        ]);
        calculate_totals(&mut inv, Decimal::ZERO).unwrap();
        let totals = inv.totals.unwrap();

        assert_eq!(totals.line_net_total, dec!(280));
        assert_eq!(totals.vat_breakdown.len(), 2);
        assert_eq!(totals.vat_breakdown[0].rate, dec!(10));
        assert_eq!(totals.vat_breakdown[0].tax_amount, dec!(5.00));
        assert_eq!(totals.vat_breakdown[1].taxable_amount, dec!(230));
        assert_eq!(totals.vat_breakdown[1].tax_amount, dec!(46.00));
        assert_eq!(totals.vat_total, dec!(51.00));
        assert_eq!(totals.gross_total, dec!(331.00));
        assert_eq!(totals.amount_due, dec!(331.00));
    }

    #[test]
    fn prepaid_reduces_amount_due() {
        let mut inv = invoice(vec![line(
            "1",
            dec!(1),
            dec!(100),
            TaxCategory::StandardRate,
            dec!(20),
        )]);
        calculate_totals(&mut inv, dec!(20)).unwrap();
        let totals = inv.totals.unwrap();
        assert_eq!(totals.gross_total, dec!(120.00));
        assert_eq!(totals.amount_due, dec!(100.00));
    }

    #[test]
    fn exempt_group_carries_vatex_code() {
        let mut inv = invoice(vec![line("1", dec!(1), dec!(80), TaxCategory::Exempt, dec!(0))]);
        calculate_totals(&mut inv, Decimal::ZERO).unwrap();
        let bd = &inv.totals.unwrap().vat_breakdown[0];
        assert_eq!(bd.tax_amount, dec!(0.00));
        assert_eq!(bd.exemption_reason_code.as_deref(), Some("vatex-eu-e"));
    }

    #[test]
    fn overflowing_line_amount_is_an_error() {
        let mut inv = invoice(vec![line(
            "1",
            dec!(2),
            Decimal::MAX,
            TaxCategory::StandardRate,
            dec!(20),
        )]);
        let err = calculate_totals(&mut inv, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, EbiError::AmountOverflow(_)));
        assert!(inv.totals.is_none());
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        let mut inv = invoice(vec![
            line("1", dec!(1), Decimal::MAX, TaxCategory::Exempt, dec!(0)),
            line("2", dec!(1), Decimal::MAX, TaxCategory::Exempt, dec!(0)),
        ]);
        assert!(calculate_totals(&mut inv, Decimal::ZERO).is_err());
        assert!(checked_sum([Decimal::MAX, Decimal::ONE], "x").is_err());
        assert_eq!(checked_sum([dec!(1.5), dec!(2)], "x").unwrap(), dec!(3.5));
    }

    #[test]
    fn rounds_commercially() {
        assert_eq!(round_half_up(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_half_up(dec!(-2.345), 2), dec!(-2.35));
    }
}
